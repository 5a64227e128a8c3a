//! Declarative role classification.
//!
//! One table answers both "does this device have its own document?" for
//! discovery and "is this device part of the view?" for graph building, so
//! the two decisions are always taken from the same rule.

use crate::model::{Role, RoleSource};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub role: Role,
    /// Type tags a document may use for this role (`bfc`, `onefabric`, ...).
    #[serde(default)]
    pub type_tags: Vec<String>,
    /// Name fragments used when a document carries no type tag.
    #[serde(default)]
    pub name_patterns: Vec<String>,
    /// Devices of this role publish their own configuration document.
    #[serde(default = "default_true")]
    pub fetchable: bool,
    /// Devices of this role are drawn.
    #[serde(default = "default_true")]
    pub include: bool,
}

impl RoleRule {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            type_tags: Vec::new(),
            name_patterns: Vec::new(),
            fetchable: true,
            include: true,
        }
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.type_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn patterns(mut self, patterns: &[&str]) -> Self {
        self.name_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn no_config(mut self) -> Self {
        self.fetchable = false;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.include = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    rules: Vec<RoleRule>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            rules: vec![
                RoleRule::new(Role::ManagementCore)
                    .tags(&["mgmt_core", "mgmt-core", "management-core"])
                    .patterns(&["-mgmt-cor-"]),
                RoleRule::new(Role::Core)
                    .tags(&["core", "cor"])
                    .patterns(&["-np-cor-", "-es-cor-", "-fnc-cor-", "-co-cor-"])
                    .no_config(),
                RoleRule::new(Role::FabricCore)
                    .tags(&["bfc", "fabric-core"])
                    .patterns(&["-es-c1"]),
                RoleRule::new(Role::Edge)
                    .tags(&["onefabric", "edge"])
                    .patterns(&["-es-e1", "-es-e2", "-es-x1"]),
                RoleRule::new(Role::Service)
                    .tags(&["euclid", "service"])
                    .patterns(&["-euclid"])
                    .excluded(),
                RoleRule::new(Role::Aggregation)
                    .tags(&["aggregation", "agg"])
                    .patterns(&["-co-agg-", "-cv1-agg", "-agg-"]),
                RoleRule::new(Role::Transit)
                    .tags(&["transit"])
                    .patterns(&["-tt-acc"])
                    .excluded(),
                RoleRule::new(Role::Firewall)
                    .tags(&["firewall", "fw"])
                    .patterns(&["-fw", "fw"]),
            ],
        }
    }
}

impl RoleTable {
    pub fn new(rules: Vec<RoleRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RoleRule] {
        &self.rules
    }

    /// Replace the rule for the same role, or append it.
    pub fn with_rule(mut self, rule: RoleRule) -> Self {
        match self.rules.iter_mut().find(|r| r.role == rule.role) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    fn rule(&self, role: Role) -> Option<&RoleRule> {
        self.rules.iter().find(|r| r.role == role)
    }

    /// Map a document's type tag to a role. Unrecognized tags yield `None`.
    pub fn classify_tag(&self, tag: &str) -> Option<Role> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|r| r.type_tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)))
            .map(|r| r.role)
            .or_else(|| Role::from_name(&tag).filter(|role| *role != Role::Unknown))
    }

    /// Infer a role from the device name alone.
    pub fn infer(&self, name: &str) -> Role {
        self.rules
            .iter()
            .find(|r| r.name_patterns.iter().any(|p| name.contains(p.as_str())))
            .map(|r| r.role)
            .unwrap_or(Role::Unknown)
    }

    /// A declared role wins; otherwise fall back to name inference.
    pub fn resolve(&self, name: &str, declared: Option<Role>) -> (Role, RoleSource) {
        match declared {
            Some(role) => (role, RoleSource::Declared),
            None => (self.infer(name), RoleSource::Inferred),
        }
    }

    pub fn is_fetchable(&self, role: Role) -> bool {
        self.rule(role).map(|r| r.fetchable).unwrap_or(true)
    }

    pub fn is_included(&self, role: Role) -> bool {
        self.rule(role).map(|r| r.include).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        let table = RoleTable::default();
        assert_eq!(table.classify_tag("bfc"), Some(Role::FabricCore));
        assert_eq!(table.classify_tag("OneFabric"), Some(Role::Edge));
        assert_eq!(table.classify_tag("mgmt_core"), Some(Role::ManagementCore));
        assert_eq!(table.classify_tag("management-core"), Some(Role::ManagementCore));
        assert_eq!(table.classify_tag("almach"), None);
        assert_eq!(table.classify_tag(""), None);
    }

    #[test]
    fn test_name_inference() {
        let table = RoleTable::default();
        assert_eq!(table.infer("bjs11-11-es-mgmt-cor-r1"), Role::ManagementCore);
        assert_eq!(table.infer("bjs11-11-np-cor-r101"), Role::Core);
        assert_eq!(table.infer("nrt12-12-es-c1"), Role::FabricCore);
        assert_eq!(table.infer("nrt12-52-es-e1"), Role::Edge);
        assert_eq!(table.infer("bjs11-11-co-agg-r3"), Role::Aggregation);
        assert_eq!(table.infer("bjs11-11-tt-acc-r1"), Role::Transit);
        assert_eq!(table.infer("something-else"), Role::Unknown);
    }

    #[test]
    fn test_core_has_no_config_and_service_is_excluded() {
        let table = RoleTable::default();
        assert!(!table.is_fetchable(Role::Core));
        assert!(table.is_fetchable(Role::FabricCore));
        assert!(table.is_fetchable(Role::Unknown));
        assert!(!table.is_included(Role::Service));
        assert!(table.is_included(Role::Core));
    }

    #[test]
    fn test_with_rule_replaces_existing() {
        let table = RoleTable::default().with_rule(RoleRule::new(Role::Service));
        assert!(table.is_included(Role::Service));
        assert_eq!(table.classify_tag("euclid"), None);
    }

    #[test]
    fn test_resolve_prefers_declared() {
        let table = RoleTable::default();
        assert_eq!(
            table.resolve("nrt12-12-es-c1", Some(Role::Core)),
            (Role::Core, RoleSource::Declared)
        );
        assert_eq!(
            table.resolve("nrt12-12-es-c1", None),
            (Role::FabricCore, RoleSource::Inferred)
        );
    }
}
