//! TOML configuration and the built-in fabric variants.
//!
//! ```toml
//! [discovery]
//! concurrency = 8
//! mode = "full"
//! source = "~/fabric-docs"
//!
//! [grouping]
//! keep_separate = ["v"]
//!
//! [[roles]]
//! role = "transit"
//! type_tags = ["transit"]
//! include = true
//!
//! [styles]
//! inter-zone = { fill = "#DAE8FC", stroke = "#FF0000" }
//!
//! [[variants]]
//! name = "lab"
//! format = "neighbor-list"
//! root = "{site}-{fabric}"
//! document = "lab/{device}.yaml"
//! ```

use crate::error::{ConfigError, Result};
use crate::graph::{BuildOptions, Category};
use crate::layout::LayoutOptions;
use crate::style::{CategoryStyle, StyleTable};
use fabricmap_scanner::normalize::SiblingRules;
use fabricmap_scanner::{
    DocumentFormat, ExpansionMode, IdentifierTemplate, Role, RoleRule, RoleTable,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    discovery: DiscoveryFile,
    grouping: SiblingRules,
    exclude_roles: Vec<String>,
    roles: Vec<RoleRule>,
    styles: BTreeMap<String, CategoryStyle>,
    layout: LayoutOptions,
    variants: Vec<VariantFile>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct DiscoveryFile {
    concurrency: Option<usize>,
    mode: Option<String>,
    max_depth: Option<usize>,
    timeout_secs: Option<u64>,
    source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct VariantFile {
    name: String,
    format: String,
    root: String,
    document: String,
    mode: Option<String>,
    #[serde(default)]
    site_scoped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub concurrency: usize,
    pub mode: ExpansionMode,
    pub max_depth: Option<usize>,
    pub timeout_secs: u64,
    /// Base URL or directory holding the documents.
    pub source: Option<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            mode: ExpansionMode::Pruned,
            max_depth: None,
            timeout_secs: 30,
            source: None,
        }
    }
}

impl DiscoverySettings {
    /// Per-fetch limit. Zero seconds means fetches are never cut short.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// A named fabric family: which format its documents use and where they live.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub format: DocumentFormat,
    pub root: IdentifierTemplate,
    pub document: IdentifierTemplate,
    /// Expansion mode forced by the variant, if any.
    pub mode: Option<ExpansionMode>,
    /// Documents cover more than one site; draw only links touching the root's site.
    pub site_scoped: bool,
}

impl Variant {
    pub fn new(name: &str, format: DocumentFormat, root: &str, document: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            format,
            root: root.parse()?,
            document: document.parse()?,
            mode: None,
            site_scoped: false,
        })
    }

    pub fn with_mode(mut self, mode: ExpansionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_site_scope(mut self) -> Self {
        self.site_scoped = true;
        self
    }

    /// Config-wide build options plus this variant's scope.
    pub fn build_options(&self, config: &Config) -> BuildOptions {
        BuildOptions {
            site_scoped: self.site_scoped,
            ..config.build_options()
        }
    }
}

fn builtin_variants() -> Result<Vec<Variant>> {
    Ok(vec![
        Variant::new(
            "ec2",
            DocumentFormat::NeighborList,
            "{site}-{fabric}",
            "site-configs/{device}.yaml",
        )?,
        // One brick file describes the whole region-fabric.
        Variant::new(
            "umn",
            DocumentFormat::NodeInterfaces,
            "{site}-{fabric}-r1",
            "brick/EC2-{REGION}/{region}-{fabric}.brick",
        )?
        .with_mode(ExpansionMode::RootOnly)
        .with_site_scope(),
        Variant::new(
            "dsn",
            DocumentFormat::Attributes,
            "{site}-{fabric}",
            "attr/{device}.attr",
        )?,
    ])
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discovery: DiscoverySettings,
    pub grouping: SiblingRules,
    pub exclude_roles: Vec<Role>,
    pub roles: RoleTable,
    pub styles: StyleTable,
    pub layout: LayoutOptions,
    pub variants: Vec<Variant>,
}

impl Config {
    /// Built-in defaults with no file applied.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            discovery: DiscoverySettings::default(),
            grouping: SiblingRules::default(),
            exclude_roles: Vec::new(),
            roles: RoleTable::default(),
            styles: StyleTable::default(),
            layout: LayoutOptions::default(),
            variants: builtin_variants()?,
        })
    }

    /// Load a config file on top of the built-in defaults. `~` is expanded.
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::builtin()?;

        let d = file.discovery;
        if let Some(concurrency) = d.concurrency {
            config.discovery.concurrency = concurrency.max(1);
        }
        if let Some(mode) = d.mode {
            config.discovery.mode = parse_mode(&mode)?;
        }
        config.discovery.max_depth = d.max_depth;
        if let Some(secs) = d.timeout_secs {
            config.discovery.timeout_secs = secs;
        }
        config.discovery.source = d.source;

        config.grouping = file.grouping;
        config.layout = file.layout;

        for name in &file.exclude_roles {
            config.exclude_roles.push(parse_role(name)?);
        }
        for rule in file.roles {
            config.roles = config.roles.with_rule(rule);
        }

        let mut overrides = BTreeMap::new();
        for (name, style) in file.styles {
            let category = Category::from_name(&name).ok_or_else(|| ConfigError::Unknown {
                kind: "category",
                name: name.clone(),
            })?;
            overrides.insert(category, style);
        }
        config.styles = config.styles.merged(&overrides);

        for v in file.variants {
            let format = DocumentFormat::from_name(&v.format).ok_or_else(|| ConfigError::Unknown {
                kind: "document format",
                name: v.format.clone(),
            })?;
            let mut variant = Variant::new(&v.name, format, &v.root, &v.document)?;
            if let Some(mode) = v.mode {
                variant = variant.with_mode(parse_mode(&mode)?);
            }
            if v.site_scoped {
                variant = variant.with_site_scope();
            }
            config.add_variant(variant);
        }

        Ok(config)
    }

    /// Replace the variant with the same name, or append it.
    pub fn add_variant(&mut self, variant: Variant) {
        match self.variants.iter_mut().find(|v| v.name == variant.name) {
            Some(existing) => *existing = variant,
            None => self.variants.push(variant),
        }
    }

    pub fn variant(&self, name: &str) -> Result<&Variant> {
        self.variants
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::NoSuchVariant(name.to_string()))
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            roles: self.roles.clone(),
            grouping: self.grouping.clone(),
            exclude_roles: self.exclude_roles.clone(),
            site_scoped: false,
        }
    }
}

pub fn parse_mode(name: &str) -> Result<ExpansionMode> {
    ExpansionMode::from_name(name).ok_or_else(|| ConfigError::Unknown {
        kind: "expansion mode",
        name: name.to_string(),
    })
}

pub fn parse_role(name: &str) -> Result<Role> {
    Role::from_name(name).ok_or_else(|| ConfigError::Unknown {
        kind: "role",
        name: name.to_string(),
    })
}

/// Expand `~` and environment variables. Falls back to the input as given.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => Path::new(path).to_path_buf(),
    }
}
