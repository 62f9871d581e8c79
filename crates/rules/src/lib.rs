mod defaults;
mod export;
mod reduce;
mod types;
mod version;

pub use defaults::default_path_rules;
pub use export::{export_policy_xml, EnforcementMode};
pub use reduce::{reduce, ReduceOptions, ReduceOutcome};
pub use types::{
    path_pattern, HashRule, PathRule, PublisherRule, Rule, RuleAction, RuleCollection,
    SourcePathRule, ADMINISTRATORS_SID, EVERYONE_SID,
};
pub use version::{BinaryVersion, VersionParseError};
