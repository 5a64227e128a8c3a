use super::{FormatAdapter, ParsedDocument};
use crate::error::ParseError;
use crate::model::{ConnectionRecord, DocumentFormat, Role};
use crate::roles::RoleTable;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};

/// YAML site configs: a `neighbors` catalog plus per-brick neighbor lists.
pub struct NeighborListAdapter;

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn load(raw: &str) -> Result<Mapping, ParseError> {
    match serde_yaml::from_str::<Value>(raw)? {
        Value::Mapping(map) => Ok(map),
        _ => Err(ParseError::NotAMapping),
    }
}

fn identity_of(map: &Mapping) -> Option<String> {
    map.get("name")
        .and_then(Value::as_str)
        .or_else(|| map.get("site").and_then(|s| s.get("name")).and_then(Value::as_str))
        .map(str::to_string)
}

impl FormatAdapter for NeighborListAdapter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::NeighborList
    }

    fn self_identity(&self, raw: &str) -> Option<String> {
        load(raw).ok().as_ref().and_then(identity_of)
    }

    fn parse(
        &self,
        raw: &str,
        self_name: &str,
        roles: &RoleTable,
    ) -> Result<ParsedDocument, ParseError> {
        let map = load(raw)?;
        let mut doc = ParsedDocument {
            self_identity: identity_of(&map),
            ..ParsedDocument::default()
        };

        let self_tag = map
            .get("site")
            .and_then(|s| s.get("topology"))
            .or_else(|| map.get("type"))
            .and_then(Value::as_str);
        doc.declare(self_name, self_tag.and_then(|t| roles.classify_tag(t)));

        // Attribute catalog: raw and canonical names both resolve to the tag.
        let mut catalog: Vec<(String, Option<Role>)> = Vec::new();
        let mut by_raw: BTreeMap<String, Option<Role>> = BTreeMap::new();
        match map.get("neighbors") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(neighbors)) => {
                for (key, entry) in neighbors {
                    let Some(raw_name) = key_string(key) else {
                        doc.warn("neighbors", "non-string neighbor key");
                        continue;
                    };
                    let role = entry
                        .get("type")
                        .and_then(Value::as_str)
                        .and_then(|t| roles.classify_tag(t));
                    let Some(name) = doc.resolve(&raw_name) else {
                        doc.warn("neighbors", format!("unresolved neighbor name {raw_name:?}"));
                        continue;
                    };
                    doc.declare(&name, role);
                    by_raw.insert(raw_name, role);
                    catalog.push((name, role));
                }
            }
            Some(_) => doc.warn("neighbors", "expected a mapping of neighbor names"),
        }

        let mut connected: HashSet<String> = HashSet::new();
        match map.get("bricks") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(bricks)) => {
                for (brick_key, brick) in bricks {
                    let brick_id = key_string(brick_key).unwrap_or_else(|| "?".to_string());
                    let section = format!("bricks.{brick_id}");
                    let neighbors = match brick {
                        Value::Mapping(_) => brick.get("neighbors"),
                        _ => {
                            doc.warn(section, "expected a mapping");
                            continue;
                        }
                    };
                    let neighbors = match neighbors {
                        None | Some(Value::Null) => continue,
                        Some(Value::Mapping(n)) => n,
                        Some(_) => {
                            doc.warn(section, "neighbors must be a mapping");
                            continue;
                        }
                    };

                    for (key, entry) in neighbors {
                        let Some(raw_name) = key_string(key) else {
                            doc.warn(section.clone(), "non-string neighbor key");
                            continue;
                        };
                        let Some(target) = doc.resolve(&raw_name) else {
                            doc.warn(
                                section.clone(),
                                format!("unresolved neighbor name {raw_name:?}"),
                            );
                            continue;
                        };
                        let label = entry
                            .get("interface")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| brick_id.clone());
                        let declared = by_raw
                            .get(&raw_name)
                            .copied()
                            .flatten()
                            .or_else(|| doc.declared_roles.get(&target).copied());

                        doc.records.push(
                            ConnectionRecord::new(self_name, target.clone())
                                .with_interface(label)
                                .with_declared_role(declared),
                        );
                        connected.insert(target);
                    }
                }
            }
            Some(_) => doc.warn("bricks", "expected a mapping of bricks"),
        }

        // Declared neighbors with no brick link still describe an adjacency.
        for (name, role) in catalog {
            if connected.insert(name.clone()) {
                doc.records
                    .push(ConnectionRecord::new(self_name, name).with_declared_role(role));
            }
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_YAML: &str = r#"
name: nrt12-12-es-c1
site:
  topology: bfc
neighbors:
  nrt12-56-es-c1-b4: { type: bfc }
  nrt12-52-es-e1-b129: { type: onefabric }
  nrt5-5-es-c1-b1: { type: bfc }
  nrt12-12-euclid-r1: { type: euclid }
bricks:
  b1:
    neighbors:
      nrt12-56-es-c1-b4: { interface: et-0/0/1 }
      nrt12-56-es-c1-b7: {}
  b2:
    neighbors:
      nrt12-52-es-e1-b129: {}
future_section:
  anything: goes
"#;

    fn parse_root(raw: &str) -> ParsedDocument {
        NeighborListAdapter
            .parse(raw, "nrt12-12-es-c1", &RoleTable::default())
            .unwrap()
    }

    #[test]
    fn test_self_identity() {
        assert_eq!(
            NeighborListAdapter.self_identity(ROOT_YAML).as_deref(),
            Some("nrt12-12-es-c1")
        );
        assert_eq!(NeighborListAdapter.self_identity("- a\n- b"), None);
    }

    #[test]
    fn test_brick_neighbors_become_records() {
        let doc = parse_root(ROOT_YAML);
        let first = &doc.records[0];
        assert_eq!(first.source, "nrt12-12-es-c1");
        assert_eq!(first.target, "nrt12-56-es-c1");
        assert_eq!(first.interface_label.as_deref(), Some("et-0/0/1"));
        assert_eq!(first.declared_role, Some(Role::FabricCore));

        // Second brick entry has no interface: brick id is the label.
        assert_eq!(doc.records[1].interface_label.as_deref(), Some("b1"));
        assert_eq!(doc.records[1].target, "nrt12-56-es-c1");
        assert_eq!(doc.records[2].declared_role, Some(Role::Edge));
    }

    #[test]
    fn test_first_spelling_is_kept_as_raw_name() {
        let doc = parse_root(ROOT_YAML);
        // The catalog lists -b4 before the brick mentions -b7.
        assert_eq!(doc.raw_names["nrt12-56-es-c1"], "nrt12-56-es-c1-b4");
        assert_eq!(doc.raw_names["nrt12-52-es-e1"], "nrt12-52-es-e1-b129");
        assert_eq!(doc.raw_names["nrt12-12-euclid-r1"], "nrt12-12-euclid-r1");
    }

    #[test]
    fn test_catalog_only_neighbors_are_declared_adjacencies() {
        let doc = parse_root(ROOT_YAML);
        let targets: Vec<&str> = doc.records.iter().map(|r| r.target.as_str()).collect();
        assert!(targets.contains(&"nrt5-5-es-c1"));
        assert!(targets.contains(&"nrt12-12-euclid-r1"));
        let catalog_only = doc
            .records
            .iter()
            .find(|r| r.target == "nrt5-5-es-c1")
            .unwrap();
        assert_eq!(catalog_only.interface_label, None);
        assert_eq!(doc.declared_roles["nrt12-12-es-c1"], Role::FabricCore);
        assert_eq!(doc.declared_roles["nrt12-12-euclid-r1"], Role::Service);
    }

    #[test]
    fn test_malformed_section_is_skipped() {
        let raw = r#"
neighbors: [not, a, mapping]
bricks:
  b1: just-a-string
  b2:
    neighbors:
      iad1-1-es-c1-b1: {}
"#;
        let doc = parse_root(raw);
        assert_eq!(doc.warnings.len(), 2);
        assert_eq!(doc.records.len(), 1);
        assert_eq!(doc.records[0].target, "iad1-1-es-c1");
        assert_eq!(doc.records[0].declared_role, None);
    }

    #[test]
    fn test_unresolvable_neighbor_is_dropped() {
        let raw = "bricks:\n  b1:\n    neighbors:\n      \"bad name\": {}\n";
        let doc = parse_root(raw);
        assert!(doc.records.is_empty());
        assert_eq!(doc.warnings.len(), 1);
    }

    #[test]
    fn test_non_mapping_document_fails() {
        let result = NeighborListAdapter.parse("- a\n- b\n", "x", &RoleTable::default());
        assert!(matches!(result, Err(ParseError::NotAMapping)));
        let result = NeighborListAdapter.parse("key: [unclosed", "x", &RoleTable::default());
        assert!(matches!(result, Err(ParseError::Yaml(_))));
    }
}
