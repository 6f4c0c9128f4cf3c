//! hawkcache CLI - exercise the response cache against a live API

use clap::Parser;

mod cli;
mod output;

use cli::args::GlobalOptions;
use cli::{Cli, Commands, PolicyCommands};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Fetch(args) => cli::fetch::run(&opts, &args).await,
        Commands::Replay { file } => cli::replay::run(&opts, &file).await,
        Commands::Policy(policy_cmd) => match policy_cmd {
            PolicyCommands::Check { file } => cli::policy::check(&opts, file.as_deref()),
        },
        Commands::Version => {
            println!("hawkcache version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `--debug` forces debug output; otherwise `RUST_LOG` applies, defaulting to warnings
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}
