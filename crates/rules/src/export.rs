//! Rule-set export in the enforcement tool's native XML schema.
//!
//! The three enforcement states produce identical rule content; only the
//! per-collection `EnforcementMode` attribute differs. Rule ids are
//! derived from the rule identity, so re-exporting the same policy yields
//! byte-identical output.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::types::{Rule, RuleCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    NotConfigured,
    AuditOnly,
    Enabled,
}

impl EnforcementMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "NotConfigured",
            Self::AuditOnly => "AuditOnly",
            Self::Enabled => "Enabled",
        }
    }
}

pub fn export_policy_xml(rules: &[Rule], mode: EnforcementMode) -> String {
    let mut out = String::new();
    out.push_str("<AppLockerPolicy Version=\"1\">\n");
    for collection in RuleCollection::ALL {
        let _ = writeln!(
            out,
            "  <RuleCollection Type=\"{}\" EnforcementMode=\"{}\">",
            collection.as_str(),
            mode.as_str()
        );
        for rule in rules.iter().filter(|r| r.collection() == collection) {
            write_rule(&mut out, rule);
        }
        out.push_str("  </RuleCollection>\n");
    }
    out.push_str("</AppLockerPolicy>\n");
    out
}

fn write_rule(out: &mut String, rule: &Rule) {
    let id = rule_id(rule);
    match rule {
        Rule::Publisher(r) => {
            let _ = writeln!(
                out,
                "    <FilePublisherRule Id=\"{}\" Name=\"{}\" Description=\"{}\" UserOrGroupSid=\"{}\" Action=\"{}\">",
                id,
                escape(&r.label),
                escape(&r.description),
                escape(&r.user_or_group_sid),
                r.action.as_str()
            );
            out.push_str("      <Conditions>\n");
            let _ = writeln!(
                out,
                "        <FilePublisherCondition PublisherName=\"{}\" ProductName=\"{}\" BinaryName=\"{}\">",
                escape(&r.publisher_name),
                escape(&r.product_name),
                escape(&r.binary_name)
            );
            let low = r
                .minimum_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "*".to_string());
            let _ = writeln!(
                out,
                "          <BinaryVersionRange LowSection=\"{}\" HighSection=\"*\" />",
                low
            );
            out.push_str("        </FilePublisherCondition>\n");
            out.push_str("      </Conditions>\n");
            out.push_str("    </FilePublisherRule>\n");
        }
        Rule::Hash(r) => {
            let _ = writeln!(
                out,
                "    <FileHashRule Id=\"{}\" Name=\"{}\" Description=\"{}\" UserOrGroupSid=\"{}\" Action=\"{}\">",
                id,
                escape(&r.label),
                escape(&r.description),
                escape(&r.user_or_group_sid),
                r.action.as_str()
            );
            out.push_str("      <Conditions>\n");
            out.push_str("        <FileHashCondition>\n");
            let _ = writeln!(
                out,
                "          <FileHash Type=\"SHA256\" Data=\"0x{}\" SourceFileName=\"{}\" SourceFileLength=\"{}\" />",
                r.sha256_hex.to_uppercase(),
                escape(&r.file_name),
                r.file_length
            );
            out.push_str("        </FileHashCondition>\n");
            out.push_str("      </Conditions>\n");
            out.push_str("    </FileHashRule>\n");
        }
        Rule::Path(r) => {
            write_path_rule(
                out,
                &id,
                &r.label,
                &r.description,
                &r.user_or_group_sid,
                r.action.as_str(),
                &r.path,
                &r.exceptions,
            );
        }
        Rule::SourcePath(r) => {
            write_path_rule(
                out,
                &id,
                &r.label,
                &r.description,
                &r.user_or_group_sid,
                r.action.as_str(),
                &r.path_pattern(),
                &r.exceptions,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn write_path_rule(
    out: &mut String,
    id: &str,
    label: &str,
    description: &str,
    sid: &str,
    action: &str,
    path: &str,
    exceptions: &[String],
) {
    let _ = writeln!(
        out,
        "    <FilePathRule Id=\"{}\" Name=\"{}\" Description=\"{}\" UserOrGroupSid=\"{}\" Action=\"{}\">",
        id,
        escape(label),
        escape(description),
        escape(sid),
        action
    );
    out.push_str("      <Conditions>\n");
    let _ = writeln!(
        out,
        "        <FilePathCondition Path=\"{}\" />",
        escape(path)
    );
    out.push_str("      </Conditions>\n");
    if !exceptions.is_empty() {
        out.push_str("      <Exceptions>\n");
        for exception in exceptions {
            let _ = writeln!(
                out,
                "        <FilePathCondition Path=\"{}\" />",
                escape(exception)
            );
        }
        out.push_str("      </Exceptions>\n");
    }
    out.push_str("    </FilePathRule>\n");
}

/// Deterministic rule id in GUID form, derived from the rule identity.
fn rule_id(rule: &Rule) -> String {
    let identity = match rule {
        Rule::Publisher(r) => format!(
            "publisher|{:?}|{}|{}|{}",
            r.collection, r.publisher_name, r.product_name, r.binary_name
        ),
        Rule::Hash(r) => format!("hash|{:?}|{}|{}", r.collection, r.file_name, r.sha256_hex),
        Rule::Path(r) => format!("path|{:?}|{}|{}", r.collection, r.path, r.user_or_group_sid),
        Rule::SourcePath(r) => format!(
            "source-path|{:?}|{}|{}",
            r.collection, r.source_root, r.user_or_group_sid
        ),
    };
    let digest = Sha256::digest(identity.as_bytes());
    format!(
        "{}-{}-{}-{}-{}",
        hex(&digest[0..4]),
        hex(&digest[4..6]),
        hex(&digest[6..8]),
        hex(&digest[8..10]),
        hex(&digest[10..16])
    )
}

fn hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        HashRule, PathRule, PublisherRule, RuleAction, EVERYONE_SID,
    };

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::Publisher(PublisherRule {
                binary_name: "WIDGET.EXE".to_string(),
                product_name: "Widget & Co".to_string(),
                publisher_name: "O=CONTOSO".to_string(),
                minimum_version: Some("1.0.5.0".parse().unwrap()),
                collection: RuleCollection::Exe,
                action: RuleAction::Allow,
                user_or_group_sid: EVERYONE_SID.to_string(),
                label: "Widget".to_string(),
                description: "Product: Widget & Co".to_string(),
            }),
            Rule::Hash(HashRule {
                file_name: "loose.exe".to_string(),
                sha256_hex: "ab".repeat(32),
                file_length: 2048,
                collection: RuleCollection::Exe,
                action: RuleAction::Allow,
                user_or_group_sid: EVERYONE_SID.to_string(),
                label: "loose.exe HASH RULE".to_string(),
                description: "Identified at C:\\drop\\loose.exe".to_string(),
            }),
            Rule::Path(PathRule {
                path: r"%WINDIR%\*".to_string(),
                exceptions: vec![r"%WINDIR%\Temp\*".to_string()],
                collection: RuleCollection::Script,
                action: RuleAction::Allow,
                user_or_group_sid: EVERYONE_SID.to_string(),
                label: "Scripts from Windows".to_string(),
                description: String::new(),
            }),
        ]
    }

    #[test]
    fn export_is_well_formed_with_all_collections() {
        let xml = export_policy_xml(&sample_rules(), EnforcementMode::AuditOnly);
        let doc = roxmltree::Document::parse(&xml).expect("well-formed export");

        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "AppLockerPolicy");
        let collections: Vec<_> = root
            .children()
            .filter(|n| n.has_tag_name("RuleCollection"))
            .collect();
        assert_eq!(collections.len(), 4);
        for collection in &collections {
            assert_eq!(
                collection.attribute("EnforcementMode"),
                Some("AuditOnly")
            );
        }
    }

    #[test]
    fn modes_differ_only_in_the_enforcement_attribute() {
        let rules = sample_rules();
        let audit = export_policy_xml(&rules, EnforcementMode::AuditOnly);
        let enforce = export_policy_xml(&rules, EnforcementMode::Enabled);
        let unconfigured = export_policy_xml(&rules, EnforcementMode::NotConfigured);

        assert_eq!(audit.replace("AuditOnly", "Enabled"), enforce);
        assert_eq!(audit.replace("AuditOnly", "NotConfigured"), unconfigured);
    }

    #[test]
    fn publisher_rule_renders_floor_and_open_ceiling() {
        let xml = export_policy_xml(&sample_rules(), EnforcementMode::Enabled);
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let range = doc
            .descendants()
            .find(|n| n.has_tag_name("BinaryVersionRange"))
            .expect("version range");
        assert_eq!(range.attribute("LowSection"), Some("1.0.5.0"));
        assert_eq!(range.attribute("HighSection"), Some("*"));
    }

    #[test]
    fn floorless_publisher_rule_renders_open_range() {
        let mut rules = sample_rules();
        if let Rule::Publisher(r) = &mut rules[0] {
            r.minimum_version = None;
        }
        let xml = export_policy_xml(&rules, EnforcementMode::Enabled);
        assert!(xml.contains(r#"LowSection="*" HighSection="*""#));
    }

    #[test]
    fn hash_rule_renders_prefixed_uppercase_digest() {
        let xml = export_policy_xml(&sample_rules(), EnforcementMode::Enabled);
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let hash = doc
            .descendants()
            .find(|n| n.has_tag_name("FileHash"))
            .expect("file hash");
        assert_eq!(hash.attribute("Type"), Some("SHA256"));
        let data = hash.attribute("Data").unwrap();
        assert!(data.starts_with("0xAB"));
        assert_eq!(data.len(), 2 + 64);
        assert_eq!(hash.attribute("SourceFileLength"), Some("2048"));
    }

    #[test]
    fn path_exceptions_nest_under_the_rule() {
        let xml = export_policy_xml(&sample_rules(), EnforcementMode::Enabled);
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let exceptions = doc
            .descendants()
            .find(|n| n.has_tag_name("Exceptions"))
            .expect("exceptions element");
        let carved: Vec<_> = exceptions
            .children()
            .filter(|n| n.has_tag_name("FilePathCondition"))
            .collect();
        assert_eq!(carved.len(), 1);
        assert_eq!(carved[0].attribute("Path"), Some(r"%WINDIR%\Temp\*"));
    }

    #[test]
    fn markup_characters_in_labels_are_escaped() {
        let xml = export_policy_xml(&sample_rules(), EnforcementMode::Enabled);
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let publisher = doc
            .descendants()
            .find(|n| n.has_tag_name("FilePublisherCondition"))
            .unwrap();
        assert_eq!(publisher.attribute("ProductName"), Some("Widget & Co"));
    }

    #[test]
    fn rule_ids_are_deterministic_and_distinct() {
        let rules = sample_rules();
        let first = export_policy_xml(&rules, EnforcementMode::Enabled);
        let second = export_policy_xml(&rules, EnforcementMode::Enabled);
        assert_eq!(first, second);

        let doc = roxmltree::Document::parse(&first).unwrap();
        let mut ids: Vec<&str> = doc
            .descendants()
            .filter_map(|n| n.attribute("Id"))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total, "rule ids must be unique");
    }
}
