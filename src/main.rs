//! hostkeeper entry point.

use std::process::ExitCode;

use clap::Parser;
use hostkeeper::cli::{commands, Cli, Commands};
use hostkeeper::config::AgentConfig;
use hostkeeper::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = AgentConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Apply {
            domain,
            artifact,
            op,
            payload_file,
        } => commands::apply::execute(&config, domain, artifact, *op, payload_file.as_deref()),
        Commands::Artifact { command } => commands::artifact::execute(&config, command),
        Commands::Backup => commands::backup::execute(&config),
        Commands::Share { command } => commands::share::execute(&config, command),
        Commands::Validate => commands::validate::execute(&config, &cli.config),
    }
}
