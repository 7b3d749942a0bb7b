use anyhow::Result;
use clap::Parser;
use tirair_cli::{commands, AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // --verbose wins over RUST_LOG; otherwise RUST_LOG, then info
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = AppContext::from_cli(&cli);
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(&ctx, &args).await,
        Commands::Train(args) => commands::train::run(&ctx, &args, &mut stdout).await,
        Commands::Predict { temperature } => commands::predict::run(&ctx, temperature, &mut stdout),
        Commands::History { limit, json } => {
            commands::history::run(&ctx, limit, json, &mut stdout)
        }
        Commands::Status => commands::status::run(&ctx, &mut stdout),
        Commands::Control { command } => commands::control::run(&ctx, command).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
