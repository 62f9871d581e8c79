use super::*;

use rules::{PathRule, Rule, RuleAction, RuleCollection, EVERYONE_SID};

fn open_store(dir: &Path) -> PolicyStore {
    PolicyStore::open(dir, None).expect("open store")
}

fn path_rule(label: &str) -> Rule {
    Rule::Path(PathRule {
        path: r"%WINDIR%\*".to_string(),
        exceptions: Vec::new(),
        collection: RuleCollection::Exe,
        action: RuleAction::Allow,
        user_or_group_sid: EVERYONE_SID.to_string(),
        label: label.to_string(),
        description: String::new(),
    })
}

#[test]
fn fresh_store_self_initializes_with_an_active_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());

    assert_eq!(store.len(), 1);
    assert_eq!(store.active_name(), DEFAULT_POLICY_NAME);
    assert!(dir
        .path()
        .join(format!("{}.policy.json", DEFAULT_POLICY_NAME))
        .exists());
}

#[test]
fn create_rejects_duplicates_unless_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());

    store.create("Servers", "server fleet", false).unwrap();
    let err = store.create("Servers", "again", false).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));

    store.create("Servers", "replaced", true).unwrap();
    assert_eq!(store.get("Servers").unwrap().description, "replaced");
}

#[test]
fn invalid_policy_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());

    for bad in ["", "a/b", "a\\b", ".hidden"] {
        let err = store.create(bad, "", false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)), "{:?}", bad);
    }
}

#[test]
fn mutations_flush_to_disk_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store.create("Workstations", "", false).unwrap();
    store
        .add_rule("Workstations", path_rule("windows tree"))
        .unwrap();

    // A second store instance sees the mutation without any explicit save.
    let reopened = open_store(dir.path());
    assert_eq!(reopened.get("Workstations").unwrap().rules.len(), 1);
}

#[test]
fn duplicate_labels_abort_without_partial_commit() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store.create("P", "", false).unwrap();
    store.add_rule("P", path_rule("base")).unwrap();

    let err = store
        .add_rules("P", vec![path_rule("fresh"), path_rule("BASE")])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateLabel(_)));
    // Neither rule of the failed batch landed.
    assert_eq!(store.get("P").unwrap().rules.len(), 1);
}

#[test]
fn remove_rule_by_label_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store.create("P", "", false).unwrap();
    store.add_rule("P", path_rule("Windows Tree")).unwrap();

    store.remove_rule("P", "windows tree").unwrap();
    assert!(store.get("P").unwrap().rules.is_empty());

    let err = store.remove_rule("P", "windows tree").unwrap_err();
    assert!(matches!(err, StoreError::RuleNotFound { .. }));
}

#[test]
fn deleting_the_active_policy_promotes_a_survivor() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store.create("Alpha", "", false).unwrap();
    store.create("Beta", "", false).unwrap();
    store.set_active("Beta").unwrap();

    store.delete("Beta").unwrap();

    assert!(store.get("Beta").is_err());
    // Survivors: Alpha and the initial default; pointer lands on one.
    assert!(store.names().contains(&store.active_name()));
    assert_ne!(store.active_name(), "Beta");
}

#[test]
fn deleting_the_only_policy_leaves_one_fresh_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store
        .add_rule(DEFAULT_POLICY_NAME, path_rule("something"))
        .unwrap();

    store.delete(DEFAULT_POLICY_NAME).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.active_name(), DEFAULT_POLICY_NAME);
    assert!(
        store.active().rules.is_empty(),
        "replacement default must be fresh"
    );
}

#[test]
fn delete_unknown_policy_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    assert!(matches!(
        store.delete("Ghost").unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test]
fn set_active_requires_an_existing_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());

    assert!(matches!(
        store.set_active("Ghost").unwrap_err(),
        StoreError::NotFound(_)
    ));

    store.create("Real", "", false).unwrap();
    store.set_active("Real").unwrap();
    assert_eq!(store.active_name(), "Real");
}

#[test]
fn active_pointer_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = open_store(dir.path());
        store.create("Pinned", "", false).unwrap();
        store.set_active("Pinned").unwrap();
    }

    let store = open_store(dir.path());
    assert_eq!(store.active_name(), "Pinned");
}

#[test]
fn active_hint_wins_when_it_resolves() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = open_store(dir.path());
        store.create("A", "", false).unwrap();
        store.create("B", "", false).unwrap();
    }

    let store = PolicyStore::open(dir.path(), Some("B")).unwrap();
    assert_eq!(store.active_name(), "B");

    let store = PolicyStore::open(dir.path(), Some("Ghost")).unwrap();
    assert_ne!(store.active_name(), "Ghost");
}

#[test]
fn find_matches_glob_patterns_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(dir.path());
    store.create("Servers East", "", false).unwrap();
    store.create("Servers West", "", false).unwrap();
    store.create("Workstations", "", false).unwrap();

    let hits = store.find("servers*").unwrap();
    assert_eq!(hits.len(), 2);

    assert!(matches!(
        store.find("[").unwrap_err(),
        StoreError::Pattern(_)
    ));
}

#[test]
fn corrupt_policy_files_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = open_store(dir.path());
        store.create("Good", "", false).unwrap();
    }
    std::fs::write(dir.path().join("Bad.policy.json"), b"{ not json").unwrap();

    let store = open_store(dir.path());
    assert!(store.get("Good").is_ok());
    assert!(store.get("Bad").is_err());
}
