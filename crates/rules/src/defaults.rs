//! Stock rules for a freshly created policy.

use crate::types::{
    PathRule, Rule, RuleAction, RuleCollection, ADMINISTRATORS_SID, EVERYONE_SID,
};

/// The broad path rules the enforcement tool ships with: everyone may run
/// from the OS and Program Files trees, administrators from anywhere.
/// Seeding these into a new policy makes its first export immediately
/// usable instead of deny-everything.
pub fn default_path_rules() -> Vec<Rule> {
    let mut rules = Vec::new();
    for collection in RuleCollection::ALL {
        rules.push(path_rule(
            collection,
            EVERYONE_SID,
            r"%WINDIR%\*",
            format!("{}: run from the Windows directory", collection.as_str()),
        ));
        rules.push(path_rule(
            collection,
            EVERYONE_SID,
            r"%PROGRAMFILES%\*",
            format!("{}: run from Program Files", collection.as_str()),
        ));
        rules.push(path_rule(
            collection,
            ADMINISTRATORS_SID,
            "*",
            format!("{}: administrators run anything", collection.as_str()),
        ));
    }
    rules
}

fn path_rule(
    collection: RuleCollection,
    sid: &str,
    path: &str,
    label: String,
) -> Rule {
    Rule::Path(PathRule {
        path: path.to_string(),
        exceptions: Vec::new(),
        collection,
        action: RuleAction::Allow,
        user_or_group_sid: sid.to_string(),
        label,
        description: String::new(),
    })
}
