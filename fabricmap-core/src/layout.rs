use crate::graph::{Category, Topology};
use serde::{Deserialize, Serialize};

/// Grid parameters for the tiered layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub x_start: f64,
    pub y_start: f64,
    pub x_spacing: f64,
    pub y_spacing: f64,
    pub columns: usize,
    pub shape_width: f64,
    pub shape_height: f64,
    /// Empty rows left between two tiers.
    pub tier_gap_rows: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            x_start: 120.0,
            y_start: 100.0,
            x_spacing: 300.0,
            y_spacing: 150.0,
            columns: 4,
            shape_width: 220.0,
            shape_height: 90.0,
            tier_gap_rows: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub group: String,
    pub category: Category,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Place every node on the grid, tier by tier, sorted by group name within a tier.
pub fn layout(topology: &Topology, options: &LayoutOptions) -> Vec<Placement> {
    let columns = options.columns.max(1);
    let mut placements = Vec::with_capacity(topology.nodes.len());
    let mut row = 0;

    for tier in Category::TIERS {
        // BTreeMap iteration is already sorted by group name.
        let members: Vec<&str> = topology
            .nodes
            .values()
            .filter(|n| n.category == tier)
            .map(|n| n.group_name.as_str())
            .collect();
        if members.is_empty() {
            continue;
        }

        for (index, group) in members.iter().enumerate() {
            let r = row + index / columns;
            let c = index % columns;
            placements.push(Placement {
                group: group.to_string(),
                category: tier,
                x: options.x_start + c as f64 * options.x_spacing,
                y: options.y_start + r as f64 * options.y_spacing,
                width: options.shape_width,
                height: options.shape_height,
            });
        }

        let rows_used = members.len().div_ceil(columns);
        row += rows_used + options.tier_gap_rows;
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use fabricmap_scanner::{Locality, Role};
    use std::collections::{BTreeMap, BTreeSet};

    fn node(name: &str, category: Category) -> (String, Node) {
        (
            name.to_string(),
            Node {
                group_name: name.to_string(),
                members: vec![name.to_string()],
                role: Role::Unknown,
                locality: Locality::Unknown,
                category,
                is_root: category == Category::Root,
                missing_config: false,
                filtered_neighbor: false,
            },
        )
    }

    fn topology(nodes: Vec<(String, Node)>) -> Topology {
        Topology {
            root: "root".to_string(),
            nodes: nodes.into_iter().collect::<BTreeMap<_, _>>(),
            edges: BTreeSet::new(),
            partial: false,
        }
    }

    #[test]
    fn test_root_tier_first() {
        let topo = topology(vec![
            node("a-inter", Category::InterZone),
            node("root", Category::Root),
        ]);
        let placed = layout(&topo, &LayoutOptions::default());
        assert_eq!(placed[0].group, "root");
        assert_eq!((placed[0].x, placed[0].y), (120.0, 100.0));
        // One gap row after the root tier.
        assert_eq!(placed[1].y, 100.0 + 2.0 * 150.0);
    }

    #[test]
    fn test_grid_wraps_after_columns() {
        let mut nodes = vec![node("root", Category::Root)];
        for i in 0..5 {
            nodes.push(node(&format!("z{i}"), Category::IntraZone));
        }
        let placed = layout(&topology(nodes), &LayoutOptions::default());
        let z4 = placed.iter().find(|p| p.group == "z4").unwrap();
        let z3 = placed.iter().find(|p| p.group == "z3").unwrap();
        assert_eq!(z3.x, 120.0 + 3.0 * 300.0);
        assert_eq!(z4.x, 120.0);
        assert_eq!(z4.y, z3.y + 150.0);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let nodes = vec![
            node("root", Category::Root),
            node("b", Category::Edge),
            node("a", Category::Edge),
            node("c", Category::Core),
        ];
        let first = layout(&topology(nodes.clone()), &LayoutOptions::default());
        let second = layout(&topology(nodes), &LayoutOptions::default());
        assert_eq!(first, second);
        let order: Vec<&str> = first.iter().map(|p| p.group.as_str()).collect();
        assert_eq!(order, vec!["root", "c", "a", "b"]);
    }
}
