use anyhow::Result;

use writable::OracleOptions;

use crate::cli::WritableArgs;
use crate::context::AdminContext;
use crate::preflight;
use crate::report;

pub fn run(ctx: &mut AdminContext, args: WritableArgs, json: bool) -> Result<()> {
    let accesschk = preflight::resolve_accesschk(args.accesschk.as_deref(), &ctx.settings)?;
    preflight::ensure_elevated()?;

    let options = OracleOptions {
        known_admins: ctx.settings.known_admins.clone(),
        include_nt_service: args.include_nt_service,
    };
    let set = writable::find_writable_directories(&accesschk, &args.root, &options)?;

    let dirs: Vec<String> = set.paths().map(|p| p.display().to_string()).collect();
    report::print_rows(json, &dirs, Clone::clone)
}
