//! duetrack CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use duetrack_client::cli::{Cli, Command, ConfigAction};
use duetrack_client::commands::{self, Context};
use duetrack_client::config::ClientConfig;
use duetrack_client::error::{ClientError, ClientResult};
use duetrack_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    init_tracing(cli.tracing_config(config.debug))?;

    let ctx = Context::new(&cli, config);
    match cli.command {
        None => commands::list::run(&ctx, false, false),
        Some(Command::List { reverse, all }) => commands::list::run(&ctx, reverse, all),
        Some(Command::Fetch {
            user_id,
            password,
            replace,
        }) => {
            commands::fetch::run(&ctx, user_id.as_deref(), password.as_deref(), replace).await
        }
        Some(Command::Add {
            course,
            assignment,
            due,
            status,
            link,
        }) => commands::edit::add(&ctx, &course, &assignment, due, status.as_deref(), link),
        Some(Command::Remove { course, assignment }) => {
            commands::edit::remove(&ctx, &course, &assignment)
        }
        Some(Command::Convert { input, output }) => commands::convert::run(&input, &output),
        Some(Command::Month { year, month }) => commands::month::run(&ctx, year, month),
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&ctx.config),
            ConfigAction::Validate => commands::config::validate(&ctx),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
