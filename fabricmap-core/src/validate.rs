use crate::render::DiagramDocument;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A structural defect in a diagram. Problems are reported, never repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Problem {
    DanglingReference { connector: String, endpoint: String },
    MissingGeometry { id: String },
    MalformedGeometry { id: String, reason: String },
    DuplicateId { id: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::DanglingReference { connector, endpoint } => write!(
                f,
                "connector {} references missing shape {:?}",
                connector, endpoint
            ),
            Problem::MissingGeometry { id } => write!(f, "{} has no geometry", id),
            Problem::MalformedGeometry { id, reason } => {
                write!(f, "{} has malformed geometry: {}", id, reason)
            }
            Problem::DuplicateId { id } => write!(f, "id {} is used more than once", id),
        }
    }
}

pub fn validate(document: &DiagramDocument) -> Vec<Problem> {
    let mut problems = Vec::new();

    // Cells 0 and 1 are always present in the emitted file.
    let mut seen: BTreeSet<&str> = ["0", "1"].into_iter().collect();
    let ids = document
        .shapes
        .iter()
        .map(|s| s.id.as_str())
        .chain(document.connectors.iter().map(|c| c.id.as_str()));
    for id in ids {
        if !seen.insert(id) {
            problems.push(Problem::DuplicateId { id: id.to_string() });
        }
    }

    for shape in &document.shapes {
        let Some(g) = shape.geometry else {
            problems.push(Problem::MissingGeometry {
                id: shape.id.clone(),
            });
            continue;
        };
        let reason = if ![g.x, g.y, g.width, g.height].iter().all(|v| v.is_finite()) {
            Some("non-finite coordinate".to_string())
        } else if g.width <= 0.0 || g.height <= 0.0 {
            Some(format!("non-positive size {}x{}", g.width, g.height))
        } else {
            None
        };
        if let Some(reason) = reason {
            problems.push(Problem::MalformedGeometry {
                id: shape.id.clone(),
                reason,
            });
        }
    }

    let shape_ids: BTreeSet<&str> = document.shapes.iter().map(|s| s.id.as_str()).collect();
    for connector in &document.connectors {
        for endpoint in [&connector.source, &connector.target] {
            if !shape_ids.contains(endpoint.as_str()) {
                problems.push(Problem::DanglingReference {
                    connector: connector.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
        if !connector.has_geometry {
            problems.push(Problem::MissingGeometry {
                id: connector.id.clone(),
            });
        }
    }

    problems
}
