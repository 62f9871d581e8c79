mod cli;
mod commands;
mod context;
mod preflight;
mod report;
mod settings;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use context::AdminContext;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let mut ctx = AdminContext::bootstrap()?;

    let cancel = ctx.cancel.clone();
    ctrlc::set_handler(move || cancel.cancel())?;

    let json = cli.json;
    commands::dispatch(&mut ctx, cli.command, json)?;
    ctx.finish()
}
