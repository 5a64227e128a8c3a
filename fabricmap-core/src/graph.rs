//! Canonical topology graph: grouped nodes, classified and deduplicated edges.

use fabricmap_scanner::model::{ConnectionRecord, RoleSource};
use fabricmap_scanner::normalize::{self, SiblingRules};
use fabricmap_scanner::{Discovery, Locality, Role, RoleTable};
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Classification tag that drives filtering, tiering and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Root,
    Core,
    Edge,
    Service,
    InterZone,
    IntraZone,
    Local,
    Unclassified,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Root,
        Category::Core,
        Category::Edge,
        Category::Service,
        Category::InterZone,
        Category::IntraZone,
        Category::Local,
        Category::Unclassified,
    ];

    /// Order in which node tiers are laid out top to bottom.
    pub const TIERS: [Category; 8] = [
        Category::Root,
        Category::Core,
        Category::IntraZone,
        Category::Local,
        Category::InterZone,
        Category::Edge,
        Category::Service,
        Category::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Root => "root",
            Category::Core => "core",
            Category::Edge => "edge",
            Category::Service => "service",
            Category::InterZone => "inter-zone",
            Category::IntraZone => "intra-zone",
            Category::Local => "local",
            Category::Unclassified => "unclassified",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Category::ALL.into_iter().find(|c| c.as_str() == wanted)
    }

    pub fn tier(&self) -> usize {
        Category::TIERS
            .iter()
            .position(|c| c == self)
            .unwrap_or(Category::TIERS.len())
    }

    /// Categories that follow from a role alone, ahead of any locality.
    fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Core => Some(Category::Core),
            Role::Edge => Some(Category::Edge),
            Role::Service => Some(Category::Service),
            _ => None,
        }
    }

    fn for_localities(a: &Locality, b: &Locality) -> Self {
        match (a, b) {
            (
                Locality::Known {
                    zone: zone_a,
                    datacenter: dc_a,
                    ..
                },
                Locality::Known {
                    zone: zone_b,
                    datacenter: dc_b,
                    ..
                },
            ) => {
                if zone_a != zone_b {
                    Category::InterZone
                } else if dc_a != dc_b {
                    Category::IntraZone
                } else {
                    Category::Local
                }
            }
            _ => Category::Unclassified,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub group_name: String,
    /// Canonical names folded into this group, sorted.
    pub members: Vec<String>,
    pub role: Role,
    pub locality: Locality,
    pub category: Category,
    pub is_root: bool,
    pub missing_config: bool,
    /// Out of scope, but kept so an in-scope neighbor is not left without edges.
    pub filtered_neighbor: bool,
}

/// Undirected edge between two groups. `a <= b` always holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub a: String,
    pub b: String,
    pub category: Category,
}

impl Edge {
    /// Order the endpoints. Returns `None` for a self-loop.
    pub fn new(x: &str, y: &str, category: Category) -> Option<Self> {
        if x == y {
            return None;
        }
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        Some(Self {
            a: a.to_string(),
            b: b.to_string(),
            category,
        })
    }

    pub fn touches(&self, group: &str) -> bool {
        self.a == group || self.b == group
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub roles: RoleTable,
    pub grouping: SiblingRules,
    /// Roles dropped from this view on top of the role table's own exclusions.
    pub exclude_roles: Vec<Role>,
    /// Draw only links with at least one end in the root's site.
    pub site_scoped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub root: String,
    pub nodes: BTreeMap<String, Node>,
    pub edges: BTreeSet<Edge>,
    /// Discovery was cancelled before the frontier emptied.
    pub partial: bool,
}

impl Topology {
    pub fn node(&self, group: &str) -> Option<&Node> {
        self.nodes.get(group)
    }

    pub fn edges_of<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(group))
    }

    pub fn graph(&self) -> UnGraphMap<&str, Category> {
        edge_graph(&self.edges)
    }

    pub fn count_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.category).or_insert(0) += 1;
        }
        counts
    }
}

fn edge_graph(edges: &BTreeSet<Edge>) -> UnGraphMap<&str, Category> {
    let mut graph = UnGraphMap::new();
    for edge in edges {
        graph.add_edge(edge.a.as_str(), edge.b.as_str(), edge.category);
    }
    graph
}

/// Group, classify, deduplicate and filter a finished discovery.
pub fn build(discovery: &Discovery, options: &BuildOptions) -> Topology {
    let root_locality = normalize::locality(&discovery.root);
    let scoped = options.site_scoped && root_locality != Locality::Unknown;
    let records: Vec<&ConnectionRecord> = discovery
        .records
        .iter()
        .filter(|r| {
            !scoped
                || [r.source.as_str(), r.target.as_str()]
                    .into_iter()
                    .any(|name| normalize::locality(name).same_site(&root_locality))
        })
        .collect();
    if scoped {
        debug!(
            "Site scope kept {} of {} records",
            records.len(),
            discovery.records.len()
        );
    }

    // Out-of-site devices only appear through a kept record.
    let mut names: BTreeSet<&str> = if scoped {
        BTreeSet::new()
    } else {
        discovery.devices.keys().map(String::as_str).collect()
    };
    names.insert(discovery.root.as_str());
    for record in &records {
        names.insert(&record.source);
        names.insert(&record.target);
    }

    let groups = normalize::group(names.iter().copied(), &options.grouping);
    let group_of = |name: &str| groups.get(name).cloned().unwrap_or_else(|| name.to_string());
    let root_group = group_of(&discovery.root);

    let mut members: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for &name in &names {
        members.entry(group_of(name)).or_default().push(name);
    }

    let mut nodes: BTreeMap<String, Node> = members
        .into_iter()
        .map(|(group, names)| {
            let node = make_node(discovery, &options.roles, &group, &names, &root_group, &root_locality);
            (group, node)
        })
        .collect();

    let mut edges = BTreeSet::new();
    for record in &records {
        let a = group_of(&record.source);
        let b = group_of(&record.target);
        if a == b {
            debug!("Dropping self-loop on {}", a);
            continue;
        }
        let (Some(node_a), Some(node_b)) = (nodes.get(&a), nodes.get(&b)) else {
            continue;
        };
        let category = classify_edge(node_a, node_b);
        if let Some(edge) = Edge::new(&a, &b, category) {
            edges.insert(edge);
        }
    }

    let in_scope = |node: &Node| {
        node.is_root
            || (options.roles.is_included(node.role) && !options.exclude_roles.contains(&node.role))
    };
    let excluded: BTreeSet<String> = nodes
        .values()
        .filter(|n| !in_scope(n))
        .map(|n| n.group_name.clone())
        .collect();

    let (mut kept, dropped): (BTreeSet<Edge>, BTreeSet<Edge>) = edges
        .into_iter()
        .partition(|e| !excluded.contains(&e.a) && !excluded.contains(&e.b));

    // An in-scope node whose every edge was dropped keeps those edges.
    let kept_graph = edge_graph(&kept);
    let mut rescued: BTreeSet<String> = BTreeSet::new();
    let mut restored = Vec::new();
    for edge in &dropped {
        for (near, far) in [(&edge.a, &edge.b), (&edge.b, &edge.a)] {
            let orphaned = !excluded.contains(near) && !kept_graph.contains_node(near.as_str());
            if orphaned && excluded.contains(far) {
                rescued.insert(far.clone());
                restored.push(edge.clone());
            }
        }
    }
    kept.extend(restored);

    for group in &excluded {
        if rescued.contains(group) {
            if let Some(node) = nodes.get_mut(group) {
                warn!("Keeping filtered {} so its neighbors stay connected", group);
                node.filtered_neighbor = true;
            }
        } else {
            nodes.remove(group);
        }
    }

    debug!(
        "Built topology: {} nodes, {} edges ({} filtered)",
        nodes.len(),
        kept.len(),
        excluded.len() - rescued.len()
    );

    Topology {
        root: root_group,
        nodes,
        edges: kept,
        partial: discovery.cancelled,
    }
}

fn make_node(
    discovery: &Discovery,
    roles: &RoleTable,
    group: &str,
    names: &[&str],
    root_group: &str,
    root_locality: &Locality,
) -> Node {
    let devices: Vec<_> = names.iter().filter_map(|n| discovery.device(n)).collect();

    // Declared roles win over inferred ones; otherwise the first member decides.
    let role = devices
        .iter()
        .find(|d| d.role_source == RoleSource::Declared)
        .or_else(|| devices.first())
        .map(|d| d.role)
        .unwrap_or_else(|| roles.infer(names.first().copied().unwrap_or(group)));
    let locality = devices
        .first()
        .map(|d| d.locality.clone())
        .unwrap_or_else(|| normalize::locality(names.first().copied().unwrap_or(group)));

    // A name referenced by a record but never ingested is a stub.
    let missing_config = devices.is_empty() || devices.iter().all(|d| d.missing_config());
    let is_root = group == root_group;

    let category = if is_root {
        Category::Root
    } else {
        Category::for_role(role).unwrap_or_else(|| Category::for_localities(root_locality, &locality))
    };

    Node {
        group_name: group.to_string(),
        members: names.iter().map(|n| n.to_string()).collect(),
        role,
        locality,
        category,
        is_root,
        missing_config,
        filtered_neighbor: false,
    }
}

/// Endpoint roles ranked core, edge, service, then locality. Symmetric in `a` and `b`.
fn classify_edge(a: &Node, b: &Node) -> Category {
    let ranked = [
        (Role::Core, Category::Core),
        (Role::Edge, Category::Edge),
        (Role::Service, Category::Service),
    ];
    for (role, category) in ranked {
        if a.role == role || b.role == role {
            return category;
        }
    }
    Category::for_localities(&a.locality, &b.locality)
}
