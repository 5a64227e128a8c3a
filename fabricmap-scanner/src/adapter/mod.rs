//! Format adapters: raw document text to canonical connection records.
//!
//! The adapter is always chosen by the format tag that travels with the
//! document. Content is never sniffed.

mod attributes;
mod neighbor_list;
mod node_interfaces;

pub use attributes::AttributesAdapter;
pub use neighbor_list::NeighborListAdapter;
pub use node_interfaces::NodeInterfacesAdapter;

use crate::error::ParseError;
use crate::model::{ConnectionRecord, DocumentFormat, Role};
use crate::normalize::normalize;
use crate::roles::RoleTable;
use std::collections::BTreeMap;
use std::fmt;

/// A section of a document that could not be used. The rest of the document still counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub section: String,
    pub message: String,
}

impl ParseWarning {
    pub fn new(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.section, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub self_identity: Option<String>,
    pub records: Vec<ConnectionRecord>,
    /// Roles the document tags explicitly, keyed by canonical name.
    pub declared_roles: BTreeMap<String, Role>,
    /// Name as first written in this document, keyed by canonical name.
    pub raw_names: BTreeMap<String, String>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedDocument {
    pub(crate) fn warn(&mut self, section: impl Into<String>, message: impl Into<String>) {
        let warning = ParseWarning::new(section, message);
        tracing::warn!("Skipping document section: {}", warning);
        self.warnings.push(warning);
    }

    /// Canonical form of `raw`, remembering how the document spelled it.
    pub(crate) fn resolve(&mut self, raw: &str) -> Option<String> {
        let name = normalize(raw)?;
        self.raw_names
            .entry(name.clone())
            .or_insert_with(|| raw.trim().to_string());
        Some(name)
    }

    pub(crate) fn declare(&mut self, name: &str, role: Option<Role>) {
        if let Some(role) = role {
            self.declared_roles.entry(name.to_string()).or_insert(role);
        }
    }
}

pub trait FormatAdapter: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// The device the document describes, when it says so.
    fn self_identity(&self, raw: &str) -> Option<String>;

    /// Parse `raw`. Records whose source is the document's own device use `self_name`.
    fn parse(
        &self,
        raw: &str,
        self_name: &str,
        roles: &RoleTable,
    ) -> Result<ParsedDocument, ParseError>;
}

static NEIGHBOR_LIST: NeighborListAdapter = NeighborListAdapter;
static NODE_INTERFACES: NodeInterfacesAdapter = NodeInterfacesAdapter;
static ATTRIBUTES: AttributesAdapter = AttributesAdapter;

pub fn adapter_for(format: DocumentFormat) -> &'static dyn FormatAdapter {
    match format {
        DocumentFormat::NeighborList => &NEIGHBOR_LIST,
        DocumentFormat::NodeInterfaces => &NODE_INTERFACES,
        DocumentFormat::Attributes => &ATTRIBUTES,
    }
}

pub fn parse(
    raw: &str,
    format: DocumentFormat,
    self_name: &str,
    roles: &RoleTable,
) -> Result<ParsedDocument, ParseError> {
    adapter_for(format).parse(raw, self_name, roles)
}

pub fn self_identity(raw: &str, format: DocumentFormat) -> Option<String> {
    adapter_for(format).self_identity(raw)
}
