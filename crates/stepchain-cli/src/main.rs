//! Binario `stepchain`: opera historias contra Postgres e imprime JSON.
//!
//! Códigos de salida: 0 ok, 2 uso (clap), 4 error del cliente, 5 fatal /
//! interno / transitorio.

mod commands;
mod logging;

use clap::Parser;
use stepchain::config::AppConfig;
use stepchain_core::{classify_error, ChainError, ErrorClass};

use commands::Cli;

fn exit_code(err: &ChainError) -> i32 {
    match classify_error(err) {
        ErrorClass::Client => 4,
        ErrorClass::Fatal | ErrorClass::Internal | ErrorClass::Transient => 5,
    }
}

fn main() {
    let cli = Cli::parse();
    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[stepchain] {e}");
            std::process::exit(exit_code(&e));
        }
    };
    logging::init(&cfg.log_filter);

    let outcome = stepchain::connect(&cfg).and_then(|store| commands::run(&store, cli.command));
    match outcome {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                tracing::error!("serializing output: {e}");
                std::process::exit(5);
            }
        },
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("[stepchain] {e}");
            std::process::exit(exit_code(&e));
        }
    }
}
