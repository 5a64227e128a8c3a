use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch of {identifier} timed out after {secs}s")]
    Timeout { identifier: String, secs: u64 },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document top level must be a mapping")]
    NotAMapping,

    #[error("unknown document format: {0}")]
    UnknownFormat(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("unterminated placeholder in template: {0}")]
    Unterminated(String),

    #[error("template needs {{{0}}} but no value was given")]
    MissingValue(&'static str),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("root device name {0:?} does not normalize to a usable name")]
    InvalidRoot(String),

    #[error("root device {0} has a role without its own configuration document")]
    RootNotFetchable(String),

    #[error("root device {device} could not be expanded: {reason}")]
    RootUnavailable { device: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
