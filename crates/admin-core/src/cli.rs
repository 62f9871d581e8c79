use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rules::EnforcementMode;
use scanner::SafetyMode;

#[derive(Parser, Debug)]
#[command(
    name = "applock-admin",
    version,
    about = "Build and maintain application-whitelisting rule sets"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory tree for binaries, scripts, and installers.
    Scan(ScanArgs),
    /// Enumerate directories writable by non-administrative principals.
    Writable(WritableArgs),
    /// Generate rules from a scan.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Manage named policies.
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Export a policy in the enforcement tool's XML format.
    Export(ExportArgs),
    /// Show or change stored settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SafetyArg {
    /// No descendant directory is user-writable.
    Safe,
    /// Every descendant directory is assumed user-writable.
    Unsafe,
    /// Resolve per-directory safety via AccessChk.
    Unknown,
}

impl SafetyArg {
    pub fn to_mode(self) -> SafetyMode {
        match self {
            Self::Safe => SafetyMode::Safe,
            Self::Unsafe => SafetyMode::Unsafe,
            Self::Unknown => SafetyMode::Unknown,
        }
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    pub root: PathBuf,
    #[arg(long, value_enum, default_value_t = SafetyArg::Unknown)]
    pub safety: SafetyArg,
    #[arg(long, help = "Report one row per directory instead of per file")]
    pub names_only: bool,
    #[arg(long, help = "Write the full report as JSON to this file")]
    pub out: Option<PathBuf>,
    #[arg(long, help = "AccessChk binary for unknown-safety scans")]
    pub accesschk: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WritableArgs {
    pub root: PathBuf,
    #[arg(long, help = "AccessChk binary to invoke")]
    pub accesschk: Option<PathBuf>,
    #[arg(long, help = "Count NT SERVICE accounts as non-administrative")]
    pub include_nt_service: bool,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Scan a tree, reduce the findings to rules, and add them to a policy.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    pub root: PathBuf,
    #[arg(long, value_enum, default_value_t = SafetyArg::Unknown)]
    pub safety: SafetyArg,
    #[arg(long, help = "Floor publisher rules at the lowest observed version")]
    pub min_version: bool,
    #[arg(long, help = "Prefix for generated rule labels")]
    pub label_prefix: Option<String>,
    #[arg(long, help = "Target policy (defaults to the active policy)")]
    pub policy: Option<String>,
    #[arg(long, help = "Generate deny rules instead of allow rules")]
    pub deny: bool,
    #[arg(long, help = "Reduce only files found in user-writable directories")]
    pub unsafe_only: bool,
    #[arg(
        long,
        help = "Also grant the scanned root wholesale, with writable carve-outs"
    )]
    pub with_source_path: bool,
    #[arg(long, help = "AccessChk binary for unknown-safety scans")]
    pub accesschk: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Create a new named policy.
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, help = "Replace an existing policy of the same name")]
        force: bool,
        #[arg(long, help = "Seed the stock broad path rules")]
        seed_defaults: bool,
    },
    /// List policies, optionally filtered by a glob pattern.
    List { pattern: Option<String> },
    /// Show a policy and its rules.
    Show { name: String },
    /// Delete a policy.
    Delete { name: String },
    /// Make a policy the active one.
    SetActive { name: String },
    /// Remove a rule from a policy by label.
    RemoveRule { name: String, label: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    NotConfigured,
    Audit,
    Enforce,
}

impl ModeArg {
    pub fn to_mode(self) -> EnforcementMode {
        match self {
            Self::NotConfigured => EnforcementMode::NotConfigured,
            Self::Audit => EnforcementMode::AuditOnly,
            Self::Enforce => EnforcementMode::Enabled,
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(help = "Output file (defaults under the configured output path)")]
    pub out: Option<PathBuf>,
    #[arg(long, help = "Policy to export (defaults to the active policy)")]
    pub policy: Option<String>,
    #[arg(long, value_enum, default_value_t = ModeArg::Audit)]
    pub mode: ModeArg,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current settings.
    Show,
    /// Set one settings key.
    Set { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn safety_and_mode_arguments_map_through() {
        assert_eq!(SafetyArg::Unknown.to_mode(), SafetyMode::Unknown);
        assert_eq!(ModeArg::Enforce.to_mode(), EnforcementMode::Enabled);
        assert_eq!(ModeArg::NotConfigured.to_mode(), EnforcementMode::NotConfigured);
    }
}
