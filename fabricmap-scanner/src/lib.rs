pub mod adapter;
pub mod discovery;
pub mod error;
pub mod model;
pub mod normalize;
pub mod roles;
pub mod source;
pub mod template;

pub use adapter::{ParseWarning, ParsedDocument};
pub use discovery::{CancelToken, Discovery, DiscoveryEngine, ExpansionMode, ProgressCallback};
pub use error::{DiscoveryError, FetchError, ParseError, TemplateError};
pub use model::{ConnectionRecord, Device, DeviceStatus, Document, DocumentFormat, Locality, Role};
pub use roles::{RoleRule, RoleTable};
pub use source::{DirectorySource, DocumentLocator, DocumentSource, HttpSource, MemorySource};
pub use template::{IdentifierTemplate, TemplateVars};
