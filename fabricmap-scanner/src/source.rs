use crate::error::{FetchError, Result};
use crate::model::{Document, DocumentFormat};
use crate::template::{IdentifierTemplate, TemplateVars};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Anything that can hand over the configuration document of a device.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, device: &str) -> impl Future<Output = Result<Document>> + Send;
}

/// Where a device's document lives: a template over the device name plus its format.
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    pub template: IdentifierTemplate,
    pub vars: TemplateVars,
    pub format: DocumentFormat,
}

impl DocumentLocator {
    pub fn new(template: IdentifierTemplate, vars: TemplateVars, format: DocumentFormat) -> Self {
        Self {
            template,
            vars,
            format,
        }
    }

    pub fn identifier(&self, device: &str) -> Result<String> {
        let vars = self.vars.clone().with_device(device);
        Ok(self.template.render(&vars)?)
    }
}

pub struct HttpSource {
    client: Client,
    base: Url,
    locator: DocumentLocator,
}

impl HttpSource {
    pub fn new(base: &str, locator: DocumentLocator, timeout_secs: u64) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| FetchError::InvalidIdentifier(format!("{base}: {e}")))?;
        let mut builder = Client::builder()
            .user_agent("fabricmap/0.1 (https://github.com/trapdoorsec/fabricmap)")
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5));
        // Zero leaves requests unbounded.
        if timeout_secs > 0 {
            builder = builder
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base,
            locator,
        })
    }

    pub fn url_for(&self, device: &str) -> Result<Url> {
        let identifier = self.locator.identifier(device)?;
        self.base
            .join(&identifier)
            .map_err(|e| FetchError::InvalidIdentifier(format!("{identifier}: {e}")))
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self, device: &str) -> Result<Document> {
        let url = self.url_for(device)?;
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let body = response.error_for_status()?.text().await?;

        Ok(Document {
            identifier: url.to_string(),
            format: self.locator.format,
            body,
        })
    }
}

pub struct DirectorySource {
    root: PathBuf,
    locator: DocumentLocator,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, locator: DocumentLocator) -> Self {
        Self {
            root: root.into(),
            locator,
        }
    }

    pub fn path_for(&self, device: &str) -> Result<PathBuf> {
        let identifier = self.locator.identifier(device)?;
        if identifier.split('/').any(|segment| segment == "..") {
            return Err(FetchError::InvalidIdentifier(identifier));
        }
        Ok(self.root.join(identifier))
    }
}

impl DocumentSource for DirectorySource {
    async fn fetch(&self, device: &str) -> Result<Document> {
        let path = self.path_for(device)?;
        debug!("Reading {}", path.display());

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Document {
            identifier: path.display().to_string(),
            format: self.locator.format,
            body,
        })
    }
}

/// In-memory documents keyed by device name. Records every fetch it serves.
#[derive(Default)]
pub struct MemorySource {
    documents: HashMap<String, (DocumentFormat, String)>,
    delays: HashMap<String, Duration>,
    fetched: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(
        mut self,
        device: impl Into<String>,
        format: DocumentFormat,
        body: impl Into<String>,
    ) -> Self {
        self.documents.insert(device.into(), (format, body.into()));
        self
    }

    /// Hold the fetch of `device` for `delay` before answering.
    pub fn with_delay(mut self, device: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(device.into(), delay);
        self
    }

    /// Every device fetched so far, in request order.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.lock().await.clone()
    }
}

impl DocumentSource for MemorySource {
    async fn fetch(&self, device: &str) -> Result<Document> {
        self.fetched.lock().await.push(device.to_string());
        if let Some(delay) = self.delays.get(device) {
            tokio::time::sleep(*delay).await;
        }

        let (format, body) = self
            .documents
            .get(device)
            .ok_or_else(|| FetchError::NotFound(device.to_string()))?;
        Ok(Document {
            identifier: device.to_string(),
            format: *format,
            body: body.clone(),
        })
    }
}
