//! Named rule-set collections with disk persistence.
//!
//! Each policy lives in its own `<name>.policy.json` file under the store
//! directory. Every mutating operation flushes the affected policy before
//! returning, so the on-disk state never trails memory by more than the
//! operation in flight. Exactly one policy is active at a time; the store
//! refuses to end up with zero policies or a dangling active pointer.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rules::Rule;

pub const DEFAULT_POLICY_NAME: &str = "Default";
const POLICY_FILE_SUFFIX: &str = ".policy.json";
const ACTIVE_POINTER_FILE: &str = "active";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub description: String,
    pub rules: Vec<Rule>,
}

impl Policy {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    AlreadyExists(String),
    NotFound(String),
    RuleNotFound { policy: String, label: String },
    DuplicateLabel(String),
    InvalidName(String),
    Pattern(String),
    Io(std::io::Error),
    Serialize(String),
    Deserialize { path: PathBuf, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(name) => {
                write!(f, "policy '{}' already exists (use overwrite to replace)", name)
            }
            Self::NotFound(name) => write!(f, "no policy named '{}'", name),
            Self::RuleNotFound { policy, label } => {
                write!(f, "policy '{}' has no rule labeled '{}'", policy, label)
            }
            Self::DuplicateLabel(label) => {
                write!(f, "a rule labeled '{}' already exists", label)
            }
            Self::InvalidName(name) => write!(f, "invalid policy name '{}'", name),
            Self::Pattern(message) => write!(f, "invalid name pattern: {}", message),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Serialize(message) => write!(f, "serialize error: {}", message),
            Self::Deserialize { path, message } => {
                write!(f, "failed reading {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub struct PolicyStore {
    dir: PathBuf,
    policies: BTreeMap<String, Policy>,
    active: String,
}

impl PolicyStore {
    /// Open (or initialize) the store at `dir`, loading every policy file
    /// and re-establishing a valid active pointer. `active_hint` is
    /// honored when it names an existing policy; otherwise the store
    /// self-heals to an existing policy or a fresh default.
    pub fn open(dir: impl Into<PathBuf>, active_hint: Option<&str>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut policies = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(POLICY_FILE_SUFFIX) {
                continue;
            }
            match load_policy(&path) {
                Ok(policy) => {
                    policies.insert(policy.name.clone(), policy);
                }
                Err(err) => {
                    // A corrupt file is left on disk for inspection; the
                    // store keeps working with what it can read.
                    warn!(path = %path.display(), error = %err, "skipping unreadable policy file");
                }
            }
        }

        let mut store = Self {
            dir,
            policies,
            active: String::new(),
        };

        let saved_pointer = store.read_active_pointer();
        let hint = active_hint
            .filter(|name| store.policies.contains_key(*name))
            .map(ToString::to_string);
        let pointer = hint.or_else(|| {
            saved_pointer.filter(|name| store.policies.contains_key(name))
        });

        match pointer {
            Some(name) => store.active = name,
            None => store.heal_active()?,
        }
        store.persist_active()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> &Policy {
        // The open/heal path guarantees the pointer resolves.
        &self.policies[&self.active]
    }

    pub fn get(&self, name: &str) -> StoreResult<&Policy> {
        self.policies
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Policies whose name matches a glob pattern, case-insensitively.
    pub fn find(&self, pattern: &str) -> StoreResult<Vec<&Policy>> {
        let pattern =
            Pattern::new(pattern).map_err(|err| StoreError::Pattern(err.to_string()))?;
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };
        Ok(self
            .policies
            .values()
            .filter(|p| pattern.matches_with(&p.name, options))
            .collect())
    }

    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        overwrite: bool,
    ) -> StoreResult<&Policy> {
        validate_name(name)?;
        if self.policies.contains_key(name) && !overwrite {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let policy = Policy::new(name, description);
        self.flush_policy(&policy)?;
        self.policies.insert(name.to_string(), policy);
        info!(policy = name, "policy created");
        Ok(&self.policies[name])
    }

    pub fn set_rules(&mut self, name: &str, rules: Vec<Rule>) -> StoreResult<()> {
        let policy = self
            .policies
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        policy.rules = rules;
        let snapshot = policy.clone();
        self.flush_policy(&snapshot)
    }

    pub fn add_rule(&mut self, name: &str, rule: Rule) -> StoreResult<()> {
        self.add_rules(name, vec![rule])
    }

    /// Append rules to a policy. Label collisions — against existing rules
    /// or within the batch — abort the whole operation before any
    /// mutation, so a failed add never half-commits.
    pub fn add_rules(&mut self, name: &str, rules: Vec<Rule>) -> StoreResult<()> {
        let policy = self
            .policies
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let mut seen: Vec<String> = policy
            .rules
            .iter()
            .map(|r| r.label().to_lowercase())
            .collect();
        for rule in &rules {
            let label = rule.label().to_lowercase();
            if seen.contains(&label) {
                return Err(StoreError::DuplicateLabel(rule.label().to_string()));
            }
            seen.push(label);
        }

        policy.rules.extend(rules);
        let snapshot = policy.clone();
        self.flush_policy(&snapshot)
    }

    pub fn remove_rule(&mut self, name: &str, label: &str) -> StoreResult<()> {
        let policy = self
            .policies
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let before = policy.rules.len();
        policy
            .rules
            .retain(|r| !r.label().eq_ignore_ascii_case(label));
        if policy.rules.len() == before {
            return Err(StoreError::RuleNotFound {
                policy: name.to_string(),
                label: label.to_string(),
            });
        }
        let snapshot = policy.clone();
        self.flush_policy(&snapshot)
    }

    /// Delete a policy. Deleting the active policy re-establishes a valid
    /// active pointer (surviving policy, or a fresh default) before the
    /// operation returns.
    pub fn delete(&mut self, name: &str) -> StoreResult<()> {
        if self.policies.remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let path = self.policy_path(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        info!(policy = name, "policy deleted");

        if self.active == name {
            self.heal_active()?;
            self.persist_active()?;
        }
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> StoreResult<()> {
        if !self.policies.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.active = name.to_string();
        self.persist_active()
    }

    fn heal_active(&mut self) -> StoreResult<()> {
        if let Some(name) = self.policies.keys().next() {
            self.active = name.clone();
            return Ok(());
        }
        let policy = Policy::new(DEFAULT_POLICY_NAME, "Default policy");
        self.flush_policy(&policy)?;
        self.policies.insert(policy.name.clone(), policy);
        self.active = DEFAULT_POLICY_NAME.to_string();
        info!("no policies remained; created a fresh default policy");
        Ok(())
    }

    fn policy_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, POLICY_FILE_SUFFIX))
    }

    fn flush_policy(&self, policy: &Policy) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(policy)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        atomic_write(&self.policy_path(&policy.name), content.as_bytes())?;
        Ok(())
    }

    fn read_active_pointer(&self) -> Option<String> {
        let raw = fs::read_to_string(self.dir.join(ACTIVE_POINTER_FILE)).ok()?;
        let name = raw.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    fn persist_active(&self) -> StoreResult<()> {
        atomic_write(
            &self.dir.join(ACTIVE_POINTER_FILE),
            self.active.as_bytes(),
        )?;
        Ok(())
    }
}

fn load_policy(path: &Path) -> StoreResult<Policy> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|err| StoreError::Deserialize {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Write atomically: temp file then rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)
}

fn validate_name(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests;
