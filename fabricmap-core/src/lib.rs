pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod render;
pub mod report;
pub mod run;
pub mod style;
pub mod validate;

pub use config::{Config, DiscoverySettings, Variant};
pub use error::{ConfigError, DiagramError};
pub use graph::{BuildOptions, Category, Edge, Node, Topology, build};
pub use layout::LayoutOptions;
pub use render::{DiagramDocument, render};
pub use report::{ReportFormat, Summary};
pub use run::{DiscoveryOptions, execute_discovery, locate};
pub use style::{CategoryStyle, StyleTable};
pub use validate::{Problem, validate};
