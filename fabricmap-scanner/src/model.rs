use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional role of a device in the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Core,
    FabricCore,
    Edge,
    Service,
    ManagementCore,
    Aggregation,
    Transit,
    Firewall,
    Unknown,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Core,
        Role::FabricCore,
        Role::Edge,
        Role::Service,
        Role::ManagementCore,
        Role::Aggregation,
        Role::Transit,
        Role::Firewall,
        Role::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Core => "core",
            Role::FabricCore => "fabric-core",
            Role::Edge => "edge",
            Role::Service => "service",
            Role::ManagementCore => "management-core",
            Role::Aggregation => "aggregation",
            Role::Transit => "transit",
            Role::Firewall => "firewall",
            Role::Unknown => "unknown",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Role::ALL.into_iter().find(|role| role.as_str() == wanted)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a device's role came from. A declared tag always beats an inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleSource {
    Declared,
    Inferred,
}

/// Region / availability zone / datacenter parsed from a device name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Locality {
    Known {
        region: String,
        zone: String,
        datacenter: String,
    },
    Unknown,
}

impl Locality {
    pub fn zone(&self) -> Option<&str> {
        match self {
            Locality::Known { zone, .. } => Some(zone),
            Locality::Unknown => None,
        }
    }

    pub fn datacenter(&self) -> Option<&str> {
        match self {
            Locality::Known { datacenter, .. } => Some(datacenter),
            Locality::Unknown => None,
        }
    }

    /// Both localities are known and in the same availability zone.
    pub fn same_zone(&self, other: &Locality) -> bool {
        matches!((self.zone(), other.zone()), (Some(a), Some(b)) if a == b)
    }

    /// Same zone and same datacenter, e.g. both under `bjs11-11`.
    pub fn same_site(&self, other: &Locality) -> bool {
        self.same_zone(other)
            && matches!((self.datacenter(), other.datacenter()), (Some(a), Some(b)) if a == b)
    }
}

/// Discovery state of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "reason")]
pub enum DeviceStatus {
    Queued,
    Fetching,
    Parsed,
    Expanded,
    /// Known only from other documents; deliberately never fetched.
    Leaf,
    Failed(String),
}

impl DeviceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeviceStatus::Expanded | DeviceStatus::Leaf | DeviceStatus::Failed(_)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub raw_name: String,
    pub canonical_name: String,
    pub role: Role,
    pub role_source: RoleSource,
    pub locality: Locality,
    pub has_fetchable_config: bool,
    pub status: DeviceStatus,
    pub depth: usize,
}

impl Device {
    /// The device was scheduled for a fetch that never produced a document.
    pub fn missing_config(&self) -> bool {
        matches!(self.status, DeviceStatus::Failed(_))
    }
}

/// One adjacency as written in a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub source: String,
    pub target: String,
    pub interface_label: Option<String>,
    pub declared_role: Option<Role>,
}

impl ConnectionRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            interface_label: None,
            declared_role: None,
        }
    }

    pub fn with_interface(mut self, label: impl Into<String>) -> Self {
        self.interface_label = Some(label.into());
        self
    }

    pub fn with_declared_role(mut self, role: Option<Role>) -> Self {
        self.declared_role = role;
        self
    }

    pub fn touches(&self, name: &str) -> bool {
        self.source == name || self.target == name
    }

    /// The endpoint opposite `name`, if the record touches it.
    pub fn other_end(&self, name: &str) -> Option<&str> {
        if self.source == name {
            Some(&self.target)
        } else if self.target == name {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Source document shape. Always supplied alongside the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    /// YAML site config with a `neighbors` catalog and per-brick neighbor lists.
    NeighborList,
    /// Brick JSON with `DEVICE_DETAILS` and `NODES_AND_INTERFACES`.
    NodeInterfaces,
    /// Line-oriented `.attr` file.
    Attributes,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::NeighborList => "neighbor-list",
            DocumentFormat::NodeInterfaces => "node-interfaces",
            DocumentFormat::Attributes => "attributes",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "neighbor-list" | "yaml" => Some(DocumentFormat::NeighborList),
            "node-interfaces" | "brick" | "json" => Some(DocumentFormat::NodeInterfaces),
            "attributes" | "attr" => Some(DocumentFormat::Attributes),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched configuration document.
#[derive(Debug, Clone)]
pub struct Document {
    pub identifier: String,
    pub format: DocumentFormat,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_name("management_core"), Some(Role::ManagementCore));
        assert_eq!(Role::from_name("spine"), None);
    }

    #[test]
    fn test_same_zone_requires_known_localities() {
        let a = Locality::Known {
            region: "nrt".into(),
            zone: "nrt12".into(),
            datacenter: "12".into(),
        };
        let b = Locality::Known {
            region: "nrt".into(),
            zone: "nrt12".into(),
            datacenter: "56".into(),
        };
        assert!(a.same_zone(&b));
        assert!(!a.same_zone(&Locality::Unknown));
        assert!(!Locality::Unknown.same_zone(&Locality::Unknown));
    }

    #[test]
    fn test_other_end() {
        let record = ConnectionRecord::new("a", "b");
        assert_eq!(record.other_end("a"), Some("b"));
        assert_eq!(record.other_end("b"), Some("a"));
        assert_eq!(record.other_end("c"), None);
    }
}
