use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use tracing::info;

use rules::export_policy_xml;

use crate::cli::ExportArgs;
use crate::context::AdminContext;
use crate::report;

#[derive(Serialize)]
struct ExportSummary {
    policy: String,
    path: PathBuf,
    rules: usize,
    mode: String,
}

pub fn run(ctx: &mut AdminContext, args: ExportArgs, json: bool) -> Result<()> {
    let policy = match &args.policy {
        Some(name) => ctx.store.get(name)?,
        None => ctx.store.active(),
    };

    let out = match args.out {
        Some(out) => out,
        None => match &ctx.settings.default_output_path {
            Some(dir) => dir.join(format!("{}.xml", policy.name)),
            None => bail!(
                "no output file given and no default_output_path configured; pass a path \
                 or run 'applock-admin settings set default_output_path <dir>'"
            ),
        },
    };

    let mode = args.mode.to_mode();
    let xml = export_policy_xml(&policy.rules, mode);
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    fs::write(&out, &xml).with_context(|| format!("failed writing {}", out.display()))?;
    info!(
        policy = %policy.name,
        path = %out.display(),
        mode = mode.as_str(),
        "rule set exported"
    );

    let summary = ExportSummary {
        policy: policy.name.clone(),
        rules: policy.rules.len(),
        mode: mode.as_str().to_string(),
        path: out,
    };
    report::print_one(json, &summary, |s| {
        format!(
            "exported {} rules of '{}' to {} ({})",
            s.rules,
            s.policy,
            s.path.display(),
            s.mode
        )
    })
}
