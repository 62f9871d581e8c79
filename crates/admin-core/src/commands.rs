mod export;
mod policy;
mod rules_gen;
mod scan;
mod settings;
mod writable_dirs;

use std::path::Path;

use anyhow::Result;

use scanner::{SafetyMode, WritableDirectorySet};
use writable::OracleOptions;

use crate::cli::Command;
use crate::context::AdminContext;
use crate::preflight;

pub fn dispatch(ctx: &mut AdminContext, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Scan(args) => scan::run(ctx, args, json),
        Command::Writable(args) => writable_dirs::run(ctx, args, json),
        Command::Rules { command } => rules_gen::run(ctx, command, json),
        Command::Policy { command } => policy::run(ctx, command, json),
        Command::Export(args) => export::run(ctx, args, json),
        Command::Settings { command } => settings::run(ctx, command, json),
    }
}

/// Resolve the writable-directory set an unknown-safety traversal needs.
/// This is where the environment preflight happens: tool present, token
/// elevated — both hard stops before any scan work begins.
fn writable_set_for(
    ctx: &AdminContext,
    accesschk: Option<&Path>,
    root: &Path,
    mode: SafetyMode,
) -> Result<Option<WritableDirectorySet>> {
    if mode != SafetyMode::Unknown {
        return Ok(None);
    }
    let accesschk = preflight::resolve_accesschk(accesschk, &ctx.settings)?;
    preflight::ensure_elevated()?;
    let options = OracleOptions {
        known_admins: ctx.settings.known_admins.clone(),
        include_nt_service: false,
    };
    let set = writable::find_writable_directories(&accesschk, root, &options)?;
    Ok(Some(set))
}
