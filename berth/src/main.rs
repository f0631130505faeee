// This file is part of the product Berth.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpResponse, HttpServer, Responder, middleware::Logger, web};
use berth::bootstrap::{BootstrapOutcome, ServerBootstrapper};
use berth::config::{self, Config, ValidatedConfig};
use log::{LevelFilter, error, info};
use std::io::Write;
use std::path::PathBuf;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprint!("{}", usage());
            return 1;
        }
    };

    if matches!(parsed_args.mode, RunMode::Help) {
        print!("{}", usage());
        return 0;
    }

    if let Err(error) = config::ensure_config(&parsed_args.runtime_root) {
        eprintln!("❌ Bootstrap error: {}", error);
        return 1;
    }

    let validated_config = match Config::load_and_validate(&parsed_args.runtime_root) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("❌ {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    init_logging(&validated_config);

    // The ring provider backs both the issued material and the listener.
    let _ = rustls::crypto::ring::default_provider().install_default();

    log_startup_info(&validated_config, &parsed_args.runtime_root);

    System::new().block_on(run_server(validated_config))
}

async fn run_server(config: ValidatedConfig) -> i32 {
    let mut bootstrapper = ServerBootstrapper::new(&config);
    let host = config.server.host.clone();
    let workers = config.server.workers;

    let outcome = bootstrapper.start(|port, tls| {
        HttpServer::new(|| {
            App::new()
                .wrap(Logger::new(
                    r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
                ))
                .route("/healthz", web::get().to(healthz))
        })
        .workers(workers)
        .bind_rustls_0_23((host.as_str(), port), tls.clone())
        .map(|server| server.run())
    });

    match outcome {
        BootstrapOutcome::Listening { listener: server, .. } => match server.await {
            Ok(()) => 0,
            Err(error) => {
                error!("Server terminated with error: {}", error);
                1
            }
        },
        BootstrapOutcome::Failed(error) => {
            // Degraded mode: no listener, but the process stays reachable for
            // supervision and log shipping until it is told to stop.
            error!("Startup failed: {}. Staying alive without a listener.", error);
            if let Err(signal_error) = actix_web::rt::signal::ctrl_c().await {
                error!("Signal handler unavailable: {}", signal_error);
                return 1;
            }
            info!("Shutdown requested");
            0
        }
    }
}

async fn healthz() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "berth",
        "status": "ok",
    }))
}

fn init_logging(config: &ValidatedConfig) {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    // Stable log format shared by every target.
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn log_startup_info(config: &ValidatedConfig, runtime_root: &std::path::Path) {
    info!(
        "Starting berth {} on https://{}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );
    info!("Workers: {}", config.server.workers);
    info!("Runtime root: {}", runtime_root.display());
    info!(
        "Certificate: {} (key {})",
        config.tls.cert_path().display(),
        config.tls.key_path().display()
    );
    info!(
        "Bind retries: {} with {} ms delay; reclamation sweeps: {} with {} ms delay",
        config.server.bind_retries,
        config.server.retry_delay_ms,
        config.server.reclaim_retries,
        config.server.reclaim_delay_ms
    );
}

enum RunMode {
    Serve,
    Help,
}

struct ParsedArgs {
    runtime_root: PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");

    while let Some(arg) = args.next() {
        if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else {
            return Err(format!("Unknown argument: {}", arg));
        }
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;

    Ok(ParsedArgs {
        runtime_root,
        mode: RunMode::Serve,
    })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help" || arg.eq_ignore_ascii_case("help")
}

fn make_runtime_root_absolute(runtime_root: PathBuf) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}

fn usage() -> String {
    [
        "Usage: berth [-C <root>]",
        "",
        "  -C <root>    runtime directory holding config.yaml and the certificate store",
        "  -h, --help   show this help",
        "",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{RunMode, parse_args_from};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_args_defaults_to_serving() {
        let parsed = parse_args_from(Vec::new()).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Serve));
        assert!(parsed.runtime_root.is_absolute());
    }

    #[test]
    fn parse_args_accepts_runtime_root() {
        let parsed = parse_args_from(args(&["-C", "runtime"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Serve));
        assert!(parsed.runtime_root.ends_with("runtime"));
    }

    #[test]
    fn parse_args_rejects_missing_root_value() {
        let result = parse_args_from(args(&["-C"]));
        assert!(result.is_err());
    }

    #[test]
    fn parse_args_rejects_unknown_arguments() {
        match parse_args_from(args(&["--daemon"])) {
            Err(error) => assert!(error.contains("--daemon")),
            Ok(_) => panic!("expected unknown argument rejection"),
        }
    }

    #[test]
    fn parse_args_accepts_help_flag() {
        let parsed = parse_args_from(args(&["--help"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
    }

    #[test]
    fn parse_args_accepts_help_word() {
        let parsed = parse_args_from(args(&["help"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
    }

    #[test]
    fn parse_args_accepts_help_with_runtime_root() {
        let parsed = parse_args_from(args(&["-C", "runtime", "-h"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
    }
}
