// Summary report of a discovery run and the diagram built from it

use crate::graph::Topology;
use crate::validate::Problem;
use fabricmap_scanner::{DeviceStatus, Discovery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDevice {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub root: String,
    pub generated_at: String,
    pub cancelled: bool,
    pub fetch_count: usize,
    pub devices: usize,
    pub leaves: usize,
    pub records: usize,
    pub nodes: usize,
    pub edges: usize,
    pub nodes_by_category: BTreeMap<String, usize>,
    pub edges_by_category: BTreeMap<String, usize>,
    pub failed: Vec<FailedDevice>,
    pub problems: Vec<String>,
}

impl Summary {
    pub fn new(discovery: &Discovery, topology: &Topology, problems: &[Problem]) -> Self {
        let mut edges_by_category = BTreeMap::new();
        for edge in &topology.edges {
            *edges_by_category
                .entry(edge.category.to_string())
                .or_insert(0) += 1;
        }

        let failed = discovery
            .devices
            .values()
            .filter_map(|d| match &d.status {
                DeviceStatus::Failed(reason) => Some(FailedDevice {
                    name: d.canonical_name.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect();

        Self {
            root: discovery.root.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            cancelled: discovery.cancelled,
            fetch_count: discovery.fetch_count,
            devices: discovery.devices.len(),
            leaves: discovery.leaves().count(),
            records: discovery.records.len(),
            nodes: topology.nodes.len(),
            edges: topology.edges.len(),
            nodes_by_category: topology
                .count_by_category()
                .into_iter()
                .map(|(c, n)| (c.to_string(), n))
                .collect(),
            edges_by_category,
            failed,
            problems: problems.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub fn generate(summary: &Summary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

pub fn generate_text_report(summary: &Summary) -> String {
    let rule = "━".repeat(72);
    let mut report = String::new();

    report.push_str(&format!("{}\n", rule));
    report.push_str("                      FABRICMAP TOPOLOGY SUMMARY\n");
    report.push_str(&format!("{}\n\n", rule));

    report.push_str(&format!("Root:         {}\n", summary.root));
    report.push_str(&format!("Generated:    {}\n", summary.generated_at));
    let status = if summary.cancelled {
        "Cancelled (partial)"
    } else {
        "Completed"
    };
    report.push_str(&format!("Status:       {}\n", status));
    report.push_str(&format!("Fetches:      {}\n", summary.fetch_count));
    report.push_str(&format!(
        "Devices:      {} ({} never fetched)\n",
        summary.devices, summary.leaves
    ));
    report.push_str(&format!("Records:      {}\n\n", summary.records));

    report.push_str(&format!("{}\n", rule));
    report.push_str("DIAGRAM\n");
    report.push_str(&format!("{}\n\n", rule));
    report.push_str(&format!(
        "Nodes: {}    Edges: {}\n\n",
        summary.nodes, summary.edges
    ));
    for (category, count) in &summary.nodes_by_category {
        let edges = summary.edges_by_category.get(category).copied().unwrap_or(0);
        report.push_str(&format!(
            "  {:<14} {:>4} nodes {:>4} edges\n",
            category, count, edges
        ));
    }
    // Edge-only categories (e.g. inter-zone links between two local nodes).
    for (category, edges) in &summary.edges_by_category {
        if !summary.nodes_by_category.contains_key(category) {
            report.push_str(&format!(
                "  {:<14} {:>4} nodes {:>4} edges\n",
                category, 0, edges
            ));
        }
    }
    report.push('\n');

    if !summary.failed.is_empty() {
        report.push_str(&format!("{}\n", rule));
        report.push_str("MISSING CONFIGURATION\n");
        report.push_str(&format!("{}\n\n", rule));
        for device in &summary.failed {
            report.push_str(&format!("  {:<32} {}\n", device.name, device.reason));
        }
        report.push('\n');
    }

    if !summary.problems.is_empty() {
        report.push_str(&format!("{}\n", rule));
        report.push_str("VALIDATION PROBLEMS\n");
        report.push_str(&format!("{}\n\n", rule));
        for problem in &summary.problems {
            report.push_str(&format!("  - {}\n", problem));
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(summary: &Summary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "fabricmap",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": summary.generated_at,
                "format": "json"
            },
            "summary": summary
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
