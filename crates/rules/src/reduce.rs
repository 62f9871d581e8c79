//! Rule reduction.
//!
//! Collapses a stream of discovered files into a deduplicated rule set:
//! publisher rules keyed by (binary, product, publisher) with an optional
//! merged-down version floor, hash rules keyed by (file name, hash) for
//! everything unsigned. Reduction never fails; degenerate inputs surface
//! as warnings on the outcome.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::warn;

use scanner::{DiscoveredFile, FileKind};

use crate::types::{HashRule, PublisherRule, Rule, RuleAction, RuleCollection};
use crate::version::BinaryVersion;

#[derive(Debug, Clone)]
pub struct ReduceOptions {
    /// Keep the lowest observed version of each publisher key as a floor.
    /// When off, publisher rules carry no version bound at all.
    pub enforce_minimum_version: bool,
    /// Prepended to every rule label so passes for different application
    /// bundles stay distinguishable after merging into one rule set.
    pub label_prefix: Option<String>,
    pub action: RuleAction,
    pub user_or_group_sid: String,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            enforce_minimum_version: false,
            label_prefix: None,
            action: RuleAction::Allow,
            user_or_group_sid: crate::types::EVERYONE_SID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReduceOutcome {
    pub rules: Vec<Rule>,
    pub warnings: Vec<String>,
}

pub fn reduce(discoveries: &[DiscoveredFile], options: &ReduceOptions) -> ReduceOutcome {
    let mut outcome = ReduceOutcome::default();
    if discoveries.is_empty() {
        let message = "no discovered files were provided; rule set is empty".to_string();
        warn!("{}", message);
        outcome.warnings.push(message);
        return outcome;
    }

    let mut publisher_rules: HashMap<(String, String, String), PublisherRule> = HashMap::new();
    let mut hash_rules: HashMap<(String, String), HashRule> = HashMap::new();

    for file in discoveries {
        let signed_identity = match (&file.binary_name, &file.product, &file.publisher) {
            (Some(binary), Some(product), Some(publisher)) => {
                Some((binary.clone(), product.clone(), publisher.clone()))
            }
            _ => None,
        };

        if let Some((binary_name, product_name, publisher_name)) = signed_identity {
            let key = (
                binary_name.clone(),
                product_name.clone(),
                publisher_name.clone(),
            );
            let observed = parse_observed_version(file);
            match publisher_rules.entry(key) {
                Entry::Vacant(slot) => {
                    let minimum_version = if options.enforce_minimum_version {
                        observed
                    } else {
                        None
                    };
                    slot.insert(PublisherRule {
                        label: compose_label(options.label_prefix.as_deref(), &binary_name),
                        description: format!("Product: {}", product_name),
                        binary_name,
                        product_name,
                        publisher_name,
                        minimum_version,
                        collection: collection_for(file),
                        action: options.action,
                        user_or_group_sid: options.user_or_group_sid.clone(),
                    });
                }
                Entry::Occupied(mut slot) => {
                    if options.enforce_minimum_version {
                        // A lower floor stays compatible with every version
                        // at or above it; an unknown version clears the
                        // floor rather than risking a file below it.
                        let rule = slot.get_mut();
                        rule.minimum_version = match (rule.minimum_version, observed) {
                            (Some(current), Some(new)) => Some(current.min(new)),
                            _ => None,
                        };
                    }
                }
            }
            continue;
        }

        let Some(hash) = file.sha256.as_ref() else {
            let message = format!(
                "{}: no signature identity and no content hash; file cannot be ruled",
                file.path.display()
            );
            warn!("{}", message);
            outcome.warnings.push(message);
            continue;
        };

        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let key = (file_name.to_lowercase(), hash.clone());
        hash_rules.entry(key).or_insert_with(|| HashRule {
            label: compose_label(
                options.label_prefix.as_deref(),
                &format!("{} HASH RULE", file_name),
            ),
            description: format!("Identified at {}", file.path.display()),
            file_name,
            sha256_hex: hash.clone(),
            file_length: file.size,
            collection: collection_for(file),
            action: options.action,
            user_or_group_sid: options.user_or_group_sid.clone(),
        });
    }

    outcome
        .rules
        .extend(publisher_rules.into_values().map(Rule::Publisher));
    outcome.rules.extend(hash_rules.into_values().map(Rule::Hash));
    outcome.rules.sort_by(sort_key_cmp);

    if outcome.rules.is_empty() {
        let message = "reduction produced no rules".to_string();
        warn!("{}", message);
        outcome.warnings.push(message);
    }
    outcome
}

fn parse_observed_version(file: &DiscoveredFile) -> Option<BinaryVersion> {
    file.version.as_deref().and_then(|v| v.parse().ok())
}

fn collection_for(file: &DiscoveredFile) -> RuleCollection {
    match file.kind {
        FileKind::Script => RuleCollection::Script,
        FileKind::Installer => RuleCollection::Msi,
        FileKind::Binary => match file.extension.as_str() {
            "dll" | "ocx" => RuleCollection::Dll,
            _ => RuleCollection::Exe,
        },
    }
}

fn compose_label(prefix: Option<&str>, identifier: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}: {}", prefix, identifier),
        _ => identifier.to_string(),
    }
}

fn sort_key_cmp(a: &Rule, b: &Rule) -> std::cmp::Ordering {
    fn key(rule: &Rule) -> (RuleCollection, u8, String, String) {
        match rule {
            Rule::Publisher(r) => (
                r.collection,
                0,
                r.label.clone(),
                format!("{}|{}|{}", r.publisher_name, r.product_name, r.binary_name),
            ),
            Rule::Hash(r) => (r.collection, 1, r.label.clone(), r.sha256_hex.clone()),
            Rule::Path(r) => (r.collection, 2, r.label.clone(), r.path.clone()),
            Rule::SourcePath(r) => (r.collection, 3, r.label.clone(), r.source_root.clone()),
        }
    }
    key(a).cmp(&key(b))
}
