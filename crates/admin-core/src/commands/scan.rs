use std::fs;

use anyhow::{Context as _, Result};
use tracing::info;

use scanner::{default_resolver, DirectoryWalker, ScanTarget};

use crate::cli::ScanArgs;
use crate::context::AdminContext;
use crate::report;

pub fn run(ctx: &mut AdminContext, args: ScanArgs, json: bool) -> Result<()> {
    let mode = args.safety.to_mode();
    let writable_set =
        super::writable_set_for(ctx, args.accesschk.as_deref(), &args.root, mode)?;

    let resolver = default_resolver();
    let target = ScanTarget::new(args.root.clone(), mode);
    let mut walker = DirectoryWalker::new(&target, resolver.as_ref())
        .names_only(args.names_only)
        .with_cancel_token(ctx.cancel.clone());
    if let Some(set) = writable_set.as_ref() {
        walker = walker.with_writable_set(set);
    }
    let scan = walker.collect_report();
    info!(
        root = %args.root.display(),
        files = scan.files.len(),
        directories = scan.directory_hits.len(),
        skipped = scan.skipped.len(),
        "scan finished"
    );

    if let Some(out) = &args.out {
        fs::write(out, serde_json::to_string_pretty(&scan)?)
            .with_context(|| format!("failed writing scan report to {}", out.display()))?;
    }

    if json {
        report::print_one(true, &scan, |_| String::new())?;
    } else if args.names_only {
        report::print_rows(false, &scan.directory_hits, |hit| {
            format!("{}\t{}", hit.safety.as_str(), hit.dir.display())
        })?;
    } else {
        report::print_rows(false, &scan.files, |file| {
            format!(
                "{}\t{}\t{}\t{}",
                file.kind.as_str(),
                file.safety.as_str(),
                file.publisher.as_deref().unwrap_or("-"),
                file.path.display()
            )
        })?;
        if !scan.skipped.is_empty() {
            eprintln!(
                "{} items were skipped; rerun with --json for detail",
                scan.skipped.len()
            );
        }
    }
    Ok(())
}
