use anyhow::Result;

use crate::cli::SettingsCommand;
use crate::context::AdminContext;
use crate::report;

pub fn run(ctx: &mut AdminContext, command: SettingsCommand, json: bool) -> Result<()> {
    match command {
        SettingsCommand::Show => report::print_one(json, &ctx.settings, |s| {
            format!(
                "accesschk_path: {}\nknown_admins: {}\ndefault_output_path: {}\nactive_policy: {}",
                s.accesschk_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(unset)".to_string()),
                if s.known_admins.is_empty() {
                    "(none)".to_string()
                } else {
                    s.known_admins.join(", ")
                },
                s.default_output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(unset)".to_string()),
                s.active_policy.as_deref().unwrap_or("(unset)")
            )
        }),
        SettingsCommand::Set { key, value } => {
            // The active pointer lives in the store; settings only mirror
            // it, so route through the store for validation.
            if key == "active_policy" {
                ctx.store.set_active(value.trim())?;
            }
            ctx.settings.set_key(&key, &value)?;
            ctx.settings.save()?;
            report::print_one(json, &key, |k| format!("updated {}", k))
        }
    }
}
