use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use rules::{
    reduce, ReduceOptions, Rule, RuleAction, RuleCollection, SourcePathRule, EVERYONE_SID,
};
use scanner::{default_resolver, DirectoryWalker, DiscoveredFile, Safety, ScanTarget};

use crate::cli::{GenerateArgs, RulesCommand};
use crate::context::AdminContext;
use crate::report;

#[derive(Serialize)]
struct GenerateSummary {
    policy: String,
    added: usize,
    skipped_items: usize,
    warnings: Vec<String>,
}

pub fn run(ctx: &mut AdminContext, command: RulesCommand, json: bool) -> Result<()> {
    match command {
        RulesCommand::Generate(args) => generate(ctx, args, json),
    }
}

fn generate(ctx: &mut AdminContext, args: GenerateArgs, json: bool) -> Result<()> {
    let mode = args.safety.to_mode();
    let writable_set =
        super::writable_set_for(ctx, args.accesschk.as_deref(), &args.root, mode)?;

    let resolver = default_resolver();
    let target = ScanTarget::new(args.root.clone(), mode);
    let mut walker =
        DirectoryWalker::new(&target, resolver.as_ref()).with_cancel_token(ctx.cancel.clone());
    if let Some(set) = writable_set.as_ref() {
        walker = walker.with_writable_set(set);
    }
    let scan = walker.collect_report();
    let skipped_items = scan.skipped.len();

    let discoveries: Vec<DiscoveredFile> = if args.unsafe_only {
        scan.files
            .into_iter()
            .filter(|f| f.safety == Safety::Unsafe)
            .collect()
    } else {
        scan.files
    };

    let options = ReduceOptions {
        enforce_minimum_version: args.min_version,
        label_prefix: args.label_prefix.clone(),
        action: if args.deny {
            RuleAction::Deny
        } else {
            RuleAction::Allow
        },
        ..ReduceOptions::default()
    };
    let outcome = reduce(&discoveries, &options);
    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    let mut new_rules = outcome.rules;
    if args.with_source_path {
        new_rules.push(source_path_rule(&args, writable_set.as_ref()));
    }

    let policy_name = args
        .policy
        .clone()
        .unwrap_or_else(|| ctx.store.active_name().to_string());
    let added = new_rules.len();
    ctx.store.add_rules(&policy_name, new_rules)?;
    info!(policy = %policy_name, added, "generated rules added");

    let summary = GenerateSummary {
        policy: policy_name,
        added,
        skipped_items,
        warnings: outcome.warnings,
    };
    report::print_one(json, &summary, |s| {
        format!("added {} rules to policy '{}'", s.added, s.policy)
    })
}

fn source_path_rule(
    args: &GenerateArgs,
    writable_set: Option<&scanner::WritableDirectorySet>,
) -> Rule {
    let root_text = args.root.display().to_string();
    let label = match &args.label_prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}: source tree", prefix),
        _ => format!("{} source tree", root_text),
    };
    let mut rule = SourcePathRule {
        source_root: root_text.clone(),
        exceptions: Vec::new(),
        collection: RuleCollection::Exe,
        action: if args.deny {
            RuleAction::Deny
        } else {
            RuleAction::Allow
        },
        user_or_group_sid: EVERYONE_SID.to_string(),
        label,
        description: format!("Grants everything beneath {}", root_text),
    };
    if let Some(set) = writable_set {
        rule.carve_writable(set);
    }
    Rule::SourcePath(rule)
}
