use super::{FormatAdapter, ParsedDocument};
use crate::error::ParseError;
use crate::model::{ConnectionRecord, DocumentFormat};
use crate::roles::RoleTable;
use regex::Regex;
use std::sync::LazyLock;

/// Line-oriented `.attr` files. These carry no type tags, so every role is inferred.
pub struct AttributesAdapter;

static BIDIRECTIONAL_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<-->\s+(\S+)").unwrap());
static ARROW_TARGET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-->\s+(\S+)").unwrap());
static IBGP_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)IBGP-NEIGH\s+(\S+)").unwrap());

const NOT_PEERS: [&str; 4] = ["IBGPNEIGH", "EBGPNEIGH", "RRCLIENTNEIGH", "IBGP-NEIGH"];

fn first_capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// A recognized line: its link label and the target token, if one was found.
fn classify(line: &str) -> Option<(&'static str, Option<&str>)> {
    let last_after_desc = || {
        line.split_whitespace()
            .last()
            .filter(|token| *token != "DESC")
    };

    if line.contains("DSN PARENT-CHILD-INTF") && line.contains("<-->") {
        Some(("parent-child", first_capture(&BIDIRECTIONAL_TARGET, line)))
    } else if line.contains("DSN NAME") && line.contains("SWITCH INTF") && line.contains("-->") {
        Some(("switch", first_capture(&ARROW_TARGET, line)))
    } else if IBGP_TARGET.is_match(line) || line.trim_end().ends_with("IBGP-NEIGH") {
        Some(("ibgp", first_capture(&IBGP_TARGET, line)))
    } else if line.starts_with("CUSTOMERLAG") && line.contains("DESC") {
        Some(("customer", last_after_desc()))
    } else if line.starts_with("RINGLAG") && line.contains("DESC") {
        Some(("ring", last_after_desc()))
    } else if line.contains("PEER") && !NOT_PEERS.iter().any(|p| line.starts_with(p)) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let label = if line.contains("FWPEER") { "fw-peer" } else { "peer" };
        if tokens.len() >= 3 {
            Some((label, tokens.last().copied()))
        } else {
            Some((label, None))
        }
    } else {
        None
    }
}

fn hostname(raw: &str) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("HOSTNAME"))
        .find_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

impl FormatAdapter for AttributesAdapter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Attributes
    }

    fn self_identity(&self, raw: &str) -> Option<String> {
        hostname(raw)
    }

    fn parse(
        &self,
        raw: &str,
        self_name: &str,
        _roles: &RoleTable,
    ) -> Result<ParsedDocument, ParseError> {
        let mut doc = ParsedDocument {
            self_identity: hostname(raw),
            ..ParsedDocument::default()
        };

        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("HOSTNAME") {
                continue;
            }
            let Some((label, target)) = classify(line) else {
                continue;
            };
            let section = format!("line {}", index + 1);
            let Some(target) = target else {
                doc.warn(section, format!("{label} line without a target"));
                continue;
            };
            let Some(target) = doc.resolve(target) else {
                doc.warn(section, format!("unresolved {label} target {target:?}"));
                continue;
            };
            doc.records
                .push(ConnectionRecord::new(self_name, target).with_interface(label));
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAP_ATTR: &str = "
HOSTNAME bjs11-11-np-cor-r101

# CUSTOMER
CUSTOMERLAG ae40 IP 10.191.28.204
CUSTOMERLAG ae40 DESC bjs11-11-co-cor-r1
CUSTOMERLAG ae41 DESC bjs11-11-co-agg-r1

RINGLAG ae1 METRIC 1000
RINGLAG ae1 DESC bjs10-10-np-cor-r101

IBGPNEIGH PEERGROUP bjs11-11-np-cor-r102
NAPBJSPEK PEER pek50-50-np-cor-r101
NAPBJSPEK REMOTEIP 10.104.71.86
NAPBJSPEK FWPEER pek50-50-np-cor-fw2
";

    const DSN_ATTR: &str = "
DSN PARENT-CHILD-INTF xe-0/0/1 <--> iad12-12-dsn-r1
DSN IBGP-NEIGH iad12-12-co-agg-r2 IP 10.0.0.2
DSN NAME tor1 SWITCH INTF ge-0/0/3 --> iad12-12-sw-r1
DSN PARENT-CHILD-INTF xe-0/0/2 <-->
";

    fn parse(raw: &str) -> ParsedDocument {
        AttributesAdapter
            .parse(raw, "bjs11-11-np-cor-r101", &RoleTable::default())
            .unwrap()
    }

    #[test]
    fn test_hostname_is_self_identity() {
        assert_eq!(
            AttributesAdapter.self_identity(NAP_ATTR).as_deref(),
            Some("bjs11-11-np-cor-r101")
        );
        assert_eq!(AttributesAdapter.self_identity(DSN_ATTR), None);
    }

    #[test]
    fn test_nap_lines() {
        let doc = parse(NAP_ATTR);
        let pairs: Vec<(&str, &str)> = doc
            .records
            .iter()
            .map(|r| (r.target.as_str(), r.interface_label.as_deref().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bjs11-11-co-cor-r1", "customer"),
                ("bjs11-11-co-agg-r1", "customer"),
                ("bjs10-10-np-cor-r101", "ring"),
                ("pek50-50-np-cor-r101", "peer"),
                ("pek50-50-np-cor-fw2", "fw-peer"),
            ]
        );
        assert!(doc.records.iter().all(|r| r.declared_role.is_none()));
        assert!(doc.declared_roles.is_empty());
    }

    #[test]
    fn test_dsn_lines() {
        let doc = parse(DSN_ATTR);
        let labels: Vec<&str> = doc
            .records
            .iter()
            .map(|r| r.interface_label.as_deref().unwrap())
            .collect();
        assert_eq!(labels, vec!["parent-child", "ibgp", "switch"]);
        assert_eq!(doc.records[1].target, "iad12-12-co-agg-r2");
        assert_eq!(doc.records[2].target, "iad12-12-sw-r1");

        // The last parent-child line has no target.
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].section, "line 5");
    }

    #[test]
    fn test_unrecognized_lines_are_ignored() {
        let doc = parse("SNMP COMMUNITY public\nNTP SERVER 10.0.0.1\n");
        assert!(doc.records.is_empty());
        assert!(doc.warnings.is_empty());
    }
}
