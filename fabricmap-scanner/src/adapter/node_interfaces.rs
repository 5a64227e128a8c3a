use super::{FormatAdapter, ParsedDocument};
use crate::error::ParseError;
use crate::model::{ConnectionRecord, DocumentFormat};
use crate::roles::RoleTable;
use serde_json::{Map, Value};

/// Brick JSON: `DEVICE_DETAILS` carries layers, `NODES_AND_INTERFACES` carries links.
///
/// A brick describes many devices at once, so record sources come from the
/// document rather than from the device that was fetched.
pub struct NodeInterfacesAdapter;

const DETAILS: &str = "DEVICE_DETAILS";
const LINKS: &str = "NODES_AND_INTERFACES";

fn identity_of(map: &Map<String, Value>) -> Option<String> {
    map.get("HOSTNAME")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn load(raw: &str) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAMapping),
    }
}

impl FormatAdapter for NodeInterfacesAdapter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::NodeInterfaces
    }

    fn self_identity(&self, raw: &str) -> Option<String> {
        load(raw).ok().as_ref().and_then(identity_of)
    }

    fn parse(
        &self,
        raw: &str,
        _self_name: &str,
        roles: &RoleTable,
    ) -> Result<ParsedDocument, ParseError> {
        let map = load(raw)?;
        let mut doc = ParsedDocument {
            self_identity: identity_of(&map),
            ..ParsedDocument::default()
        };

        match map.get(DETAILS) {
            None | Some(Value::Null) => {}
            Some(Value::Object(details)) => {
                for (raw_name, detail) in details {
                    let Some(name) = doc.resolve(raw_name) else {
                        doc.warn(DETAILS, format!("unresolved device name {raw_name:?}"));
                        continue;
                    };
                    let role = ["device_layer", "device_type"]
                        .iter()
                        .filter_map(|key| detail.get(*key).and_then(Value::as_str))
                        .find_map(|tag| roles.classify_tag(tag));
                    doc.declare(&name, role);
                }
            }
            Some(_) => doc.warn(DETAILS, "expected an object keyed by device"),
        }

        let links = match map.get(LINKS) {
            None | Some(Value::Null) => return Ok(doc),
            Some(Value::Object(links)) => links,
            Some(_) => {
                doc.warn(LINKS, "expected an object keyed by device");
                return Ok(doc);
            }
        };

        for (raw_source, interfaces) in links {
            let section = format!("{LINKS}.{raw_source}");
            let Some(source) = doc.resolve(raw_source) else {
                doc.warn(section, "unresolved device name");
                continue;
            };
            let Some(interfaces) = interfaces.as_object() else {
                doc.warn(section, "expected an object keyed by interface");
                continue;
            };

            for (interface, link) in interfaces {
                let Some(remote) = link
                    .get("remote_device")
                    .and_then(Value::as_str)
                    .filter(|r| !r.trim().is_empty())
                else {
                    continue;
                };
                let Some(target) = doc.resolve(remote) else {
                    doc.warn(
                        section.clone(),
                        format!("unresolved remote device {remote:?} on {interface}"),
                    );
                    continue;
                };
                let declared = doc.declared_roles.get(&target).copied();
                doc.records.push(
                    ConnectionRecord::new(source.clone(), target)
                        .with_interface(interface.clone())
                        .with_declared_role(declared),
                );
            }
        }

        Ok(doc)
    }
}
