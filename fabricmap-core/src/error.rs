use fabricmap_scanner::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("unknown {kind} {name:?}")]
    Unknown { kind: &'static str, name: String },

    #[error("no fabric variant named {0:?}")]
    NoSuchVariant(String),
}

#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("not well-formed XML: {0}")]
    Xml(String),

    #[error("not a draw.io document: {0}")]
    NotADiagram(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
