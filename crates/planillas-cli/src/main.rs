//! # Planillas CLI
//!
//! A thin binary over the `planillas` library: `src/cli/` parses arguments,
//! opens the store described by the configuration, dispatches through
//! `PlanillasApi` and renders the returned `CmdResult`. This file only starts the
//! runtime and maps failure to exit status 1.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
