//! Bookmarks Keeper operator CLI.
//!
//! Binary name: `bmk`
//!
//! Parses CLI arguments, sets up tracing, builds the bookmark store on the
//! configured backend and dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use keeper_infra::config::resolve_data_dir;
use keeper_observe::tracing_setup::{default_directive, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(default_directive(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that don't need a working store
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "bmk", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Config => {
            return cli::config::show_config(&resolve_data_dir(), cli.json).await;
        }
        _ => {}
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::List { user, columns } => {
            cli::bookmarks::list_bookmarks(&state, &user, columns, cli.json).await?;
        }
        Commands::Add { user, items } => {
            cli::bookmarks::add_bookmarks(&state, &user, &items, cli.json).await?;
        }
        Commands::Delete { user, items } => {
            cli::bookmarks::delete_bookmarks(&state, &user, &items, cli.json).await?;
        }
        Commands::Clear { user } => {
            cli::bookmarks::clear_bookmarks(&state, &user, cli.json).await?;
        }
        Commands::Show { user } => {
            cli::bookmarks::show_document(&state, &user, cli.json).await?;
        }
        Commands::Config | Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
