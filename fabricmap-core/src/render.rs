//! draw.io (`mxfile`) emission.
//!
//! The renderer first builds a [`DiagramDocument`], a plain description of
//! shapes and connectors, and only then serializes it. The validator works
//! on the same structure, whether it came from [`render`] or was read back
//! from a file with [`DiagramDocument::from_xml`].

use crate::error::DiagramError;
use crate::graph::{Node, Topology};
use crate::layout::{self, LayoutOptions};
use crate::style::StyleTable;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub label: String,
    pub style: String,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: String,
    pub source: String,
    pub target: String,
    pub style: String,
    pub has_geometry: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramDocument {
    pub name: String,
    /// Written to `mxfile/@modified` when set.
    pub modified: Option<String>,
    pub shapes: Vec<Shape>,
    pub connectors: Vec<Connector>,
}

impl DiagramDocument {
    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = Some(modified.into());
        self
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        xml.push_str("<mxfile host=\"fabricmap\"");
        if let Some(ref modified) = self.modified {
            xml.push_str(&format!(" modified=\"{}\"", escape_xml(modified)));
        }
        xml.push_str(" type=\"device\">\n");
        xml.push_str(&format!(
            "  <diagram id=\"fabricmap\" name=\"{}\">\n",
            escape_xml(&self.name)
        ));
        xml.push_str(
            "    <mxGraphModel grid=\"1\" gridSize=\"10\" guides=\"1\" tooltips=\"1\" connect=\"1\" \
             arrows=\"1\" fold=\"1\" page=\"1\" pageScale=\"1\" math=\"0\" shadow=\"0\">\n",
        );
        xml.push_str("      <root>\n");
        xml.push_str("        <mxCell id=\"0\" />\n");
        xml.push_str("        <mxCell id=\"1\" parent=\"0\" />\n");

        for shape in &self.shapes {
            xml.push_str(&format!(
                "        <mxCell id=\"{}\" value=\"{}\" style=\"{}\" vertex=\"1\" parent=\"1\">\n",
                escape_xml(&shape.id),
                escape_xml(&shape.label),
                escape_xml(&shape.style)
            ));
            if let Some(g) = shape.geometry {
                xml.push_str(&format!(
                    "          <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\" />\n",
                    g.x, g.y, g.width, g.height
                ));
            }
            xml.push_str("        </mxCell>\n");
        }

        for connector in &self.connectors {
            xml.push_str(&format!(
                "        <mxCell id=\"{}\" style=\"{}\" edge=\"1\" parent=\"1\" source=\"{}\" target=\"{}\">\n",
                escape_xml(&connector.id),
                escape_xml(&connector.style),
                escape_xml(&connector.source),
                escape_xml(&connector.target)
            ));
            if connector.has_geometry {
                xml.push_str("          <mxGeometry relative=\"1\" as=\"geometry\" />\n");
            }
            xml.push_str("        </mxCell>\n");
        }

        xml.push_str("      </root>\n");
        xml.push_str("    </mxGraphModel>\n");
        xml.push_str("  </diagram>\n");
        xml.push_str("</mxfile>\n");
        xml
    }

    /// Read back an uncompressed draw.io file.
    pub fn from_xml(xml: &str) -> Result<Self, DiagramError> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| DiagramError::Xml(e.to_string()))?;
        let mxfile = doc.root_element();
        if !mxfile.has_tag_name("mxfile") {
            return Err(DiagramError::NotADiagram("root element is not <mxfile>"));
        }
        let diagram = mxfile
            .children()
            .find(|n| n.has_tag_name("diagram"))
            .ok_or(DiagramError::NotADiagram("missing <diagram>"))?;
        let root = diagram
            .descendants()
            .find(|n| n.has_tag_name("root"))
            .ok_or(DiagramError::NotADiagram("missing <mxGraphModel><root>"))?;

        let mut document = DiagramDocument {
            name: diagram.attribute("name").unwrap_or_default().to_string(),
            modified: mxfile.attribute("modified").map(str::to_string),
            ..Default::default()
        };

        for cell in root.children().filter(|n| n.has_tag_name("mxCell")) {
            let id = cell.attribute("id").unwrap_or_default().to_string();
            let style = cell.attribute("style").unwrap_or_default().to_string();
            let geometry = cell.children().find(|n| n.has_tag_name("mxGeometry"));

            if cell.attribute("vertex") == Some("1") {
                let number = |attr: &str| {
                    geometry
                        .and_then(|g| g.attribute(attr))
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                };
                document.shapes.push(Shape {
                    id,
                    label: cell.attribute("value").unwrap_or_default().to_string(),
                    style,
                    geometry: geometry.map(|_| Geometry {
                        x: number("x"),
                        y: number("y"),
                        width: number("width"),
                        height: number("height"),
                    }),
                });
            } else if cell.attribute("edge") == Some("1") {
                document.connectors.push(Connector {
                    id,
                    source: cell.attribute("source").unwrap_or_default().to_string(),
                    target: cell.attribute("target").unwrap_or_default().to_string(),
                    style,
                    has_geometry: geometry.is_some(),
                });
            }
        }

        Ok(document)
    }
}

/// Lay out and style a topology as a diagram.
pub fn render(topology: &Topology, styles: &StyleTable, options: &LayoutOptions) -> DiagramDocument {
    let placements = layout::layout(topology, options);
    let mut ids: BTreeMap<&str, String> = BTreeMap::new();
    let mut shapes = Vec::with_capacity(placements.len());

    for (index, placement) in placements.iter().enumerate() {
        let Some(node) = topology.node(&placement.group) else {
            continue;
        };
        let id = format!("n{}", index + 1);
        ids.insert(node.group_name.as_str(), id.clone());
        shapes.push(Shape {
            id,
            label: node_label(node),
            style: node_style(node, styles),
            geometry: Some(Geometry {
                x: placement.x,
                y: placement.y,
                width: placement.width,
                height: placement.height,
            }),
        });
    }

    let mut connectors = Vec::with_capacity(topology.edges.len());
    for edge in &topology.edges {
        let (Some(source), Some(target)) = (ids.get(edge.a.as_str()), ids.get(edge.b.as_str()))
        else {
            continue;
        };
        connectors.push(Connector {
            id: format!("e{}", connectors.len() + 1),
            source: source.clone(),
            target: target.clone(),
            style: format!(
                "endArrow=none;html=1;rounded=0;strokeWidth=2;strokeColor={};",
                styles.stroke(edge.category)
            ),
            has_geometry: true,
        });
    }

    debug!(
        "Rendered {} shapes and {} connectors",
        shapes.len(),
        connectors.len()
    );

    DiagramDocument {
        name: topology.root.clone(),
        modified: None,
        shapes,
        connectors,
    }
}

fn node_label(node: &Node) -> String {
    let mut label = node.group_name.clone();
    if node.missing_config {
        label.push_str("<br>(no config)");
    }
    if node.filtered_neighbor {
        label.push_str("<br>(filtered neighbor)");
    }
    label
}

fn node_style(node: &Node, styles: &StyleTable) -> String {
    let mut style = format!(
        "rounded=1;whiteSpace=wrap;html=1;fillColor={};strokeColor=#333333;",
        styles.fill(node.category)
    );
    if node.missing_config {
        style.push_str("dashed=1;");
    }
    if node.is_root {
        style.push_str("fontStyle=1;");
    }
    style
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<br>&\"b\""), "a&lt;br&gt;&amp;&quot;b&quot;");
    }

    #[test]
    fn test_xml_reads_back() {
        let document = DiagramDocument {
            name: "site & fabric".to_string(),
            modified: None,
            shapes: vec![
                Shape {
                    id: "n1".to_string(),
                    label: "a<br>(no config)".to_string(),
                    style: "fillColor=#FFFFFF;".to_string(),
                    geometry: Some(Geometry {
                        x: 120.0,
                        y: 100.0,
                        width: 220.0,
                        height: 90.0,
                    }),
                },
                Shape {
                    id: "n2".to_string(),
                    label: "b".to_string(),
                    style: String::new(),
                    geometry: Some(Geometry {
                        x: 420.5,
                        y: 100.0,
                        width: 220.0,
                        height: 90.0,
                    }),
                },
            ],
            connectors: vec![Connector {
                id: "e1".to_string(),
                source: "n1".to_string(),
                target: "n2".to_string(),
                style: "strokeColor=#CC0000;".to_string(),
                has_geometry: true,
            }],
        }
        .with_modified("2026-01-01T00:00:00Z");

        let parsed = DiagramDocument::from_xml(&document.to_xml()).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn test_from_xml_rejects_other_documents() {
        assert!(matches!(
            DiagramDocument::from_xml("<svg/>"),
            Err(DiagramError::NotADiagram(_))
        ));
        assert!(matches!(
            DiagramDocument::from_xml("<mxfile>"),
            Err(DiagramError::Xml(_))
        ));
    }
}
