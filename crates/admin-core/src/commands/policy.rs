use anyhow::Result;
use serde::Serialize;

use rules::default_path_rules;

use crate::cli::PolicyCommand;
use crate::context::AdminContext;
use crate::report;

#[derive(Serialize)]
struct PolicyRow {
    name: String,
    description: String,
    rules: usize,
    active: bool,
}

#[derive(Serialize)]
struct RuleRow {
    label: String,
    kind: &'static str,
    collection: &'static str,
    action: &'static str,
    description: String,
}

pub fn run(ctx: &mut AdminContext, command: PolicyCommand, json: bool) -> Result<()> {
    match command {
        PolicyCommand::Create {
            name,
            description,
            force,
            seed_defaults,
        } => {
            ctx.store.create(&name, &description, force)?;
            if seed_defaults {
                ctx.store.add_rules(&name, default_path_rules())?;
            }
            let row = row_for(ctx, &name)?;
            report::print_one(json, &row, |r| format!("created policy '{}'", r.name))
        }
        PolicyCommand::List { pattern } => {
            let pattern = pattern.unwrap_or_else(|| "*".to_string());
            let rows: Vec<PolicyRow> = ctx
                .store
                .find(&pattern)?
                .into_iter()
                .map(|p| PolicyRow {
                    name: p.name.clone(),
                    description: p.description.clone(),
                    rules: p.rules.len(),
                    active: p.name == ctx.store.active_name(),
                })
                .collect();
            report::print_rows(json, &rows, |r| {
                format!(
                    "{}\t{}\t{} rules\t{}",
                    if r.active { "*" } else { " " },
                    r.name,
                    r.rules,
                    r.description
                )
            })
        }
        PolicyCommand::Show { name } => {
            let policy = ctx.store.get(&name)?;
            let rows: Vec<RuleRow> = policy
                .rules
                .iter()
                .map(|rule| RuleRow {
                    label: rule.label().to_string(),
                    kind: rule.kind_str(),
                    collection: rule.collection().as_str(),
                    action: rule.action().as_str(),
                    description: rule.description().to_string(),
                })
                .collect();
            report::print_rows(json, &rows, |r| {
                format!(
                    "{}\t{}\t{}\t{}",
                    r.action, r.collection, r.kind, r.label
                )
            })
        }
        PolicyCommand::Delete { name } => {
            ctx.store.delete(&name)?;
            let active = ctx.store.active_name().to_string();
            report::print_one(json, &active, |a| {
                format!("deleted '{}'; active policy is now '{}'", name, a)
            })
        }
        PolicyCommand::SetActive { name } => {
            ctx.store.set_active(&name)?;
            report::print_one(json, &name, |n| format!("active policy is now '{}'", n))
        }
        PolicyCommand::RemoveRule { name, label } => {
            ctx.store.remove_rule(&name, &label)?;
            report::print_one(json, &label, |l| {
                format!("removed rule '{}' from '{}'", l, name)
            })
        }
    }
}

fn row_for(ctx: &AdminContext, name: &str) -> Result<PolicyRow> {
    let policy = ctx.store.get(name)?;
    Ok(PolicyRow {
        name: policy.name.clone(),
        description: policy.description.clone(),
        rules: policy.rules.len(),
        active: policy.name == ctx.store.active_name(),
    })
}
