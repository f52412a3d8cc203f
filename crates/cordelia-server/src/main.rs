//! Cordelia Server CLI
//!
//! Starts the admissibility gate HTTP server.

use anyhow::Context;
use cordelia_server::{config::ServerConfig, start_server};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        let config_path = &args[2];
        let mut config = ServerConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path))?;
        // Environment wins over the file
        config
            .apply_env()
            .context("applying environment overrides")?;
        config
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        ServerConfig::from_env().context("reading configuration from environment")?
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Cordelia - Admissibility gate for generative output");
    println!();
    println!("USAGE:");
    println!("    cordelia-server [--config <path-to-config.toml>]");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT (overrides the file):");
    println!("    ARCHITECT_KEY        Shared secret for the X-Sovereign-Key header");
    println!("    HOST, PORT           Bind address (default 0.0.0.0:5000)");
    println!("    RATE_LIMIT_COUNT     Requests per window (default 10)");
    println!("    RATE_LIMIT_PERIOD    Window in seconds (default 60)");
    println!("    MAX_PROMPT_LENGTH    Characters (default 2048)");
    println!("    SCORING_MODE         score | review");
    println!("    KINETIC_WEIGHT, POTENTIAL_WEIGHT");
    println!("    GENERATOR_BACKEND    stub | ollama");
    println!("    VALIDATOR_BACKEND    none | ollama");
    println!("    OLLAMA_ENDPOINT, NAVIGATOR_MODEL, ARBITER_MODEL");
    println!("    RUST_LOG             Log filter (default info)");
    println!();
}
