//! Sideloader binary entry point.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use sideloader::cli::{self, EXIT_OK, OkEnvelope, exit_code_for, render_error};
use sideloader::tracing::{Level, TracingConfig, TracingFormat, init_tracing};

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let level = if cli.debug_enabled() {
        Level::DEBUG
    } else {
        Level::from(cli.level)
    };
    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Pretty
        },
        level,
        ..Default::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("{e:?}");
    }

    let code = match sideloader::run(&cli) {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string(&OkEnvelope::new(&summary)) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("Error serializing response"),
                }
            } else {
                tracing::info!(
                    name = %summary.name,
                    version = summary.version.as_deref().unwrap_or_default(),
                    package_dir = %summary.package_dir,
                    "Package built"
                );
            }
            EXIT_OK
        }
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    };

    std::process::exit(code);
}
