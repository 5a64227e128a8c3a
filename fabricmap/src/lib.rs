// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    SourceKind, discover_document, document_location, load_config, output_path, source_kind,
    validate_file, write_diagram,
};

// Re-export the discovery driver from fabricmap-core
pub use fabricmap_core::run::{DiscoveryOptions, execute_discovery, locate};
