//! String templates for root device names and document identifiers.
//!
//! `{site}-{fabric}` builds a root name, `site-configs/{device}.yaml` a
//! document path. Placeholders are checked when the template is parsed,
//! not when it is rendered.

use crate::error::TemplateError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Device,
    Site,
    Fabric,
    Region,
    RegionUpper,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "device" => Some(Placeholder::Device),
            "site" => Some(Placeholder::Site),
            "fabric" => Some(Placeholder::Fabric),
            "region" => Some(Placeholder::Region),
            "REGION" => Some(Placeholder::RegionUpper),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Placeholder::Device => "device",
            Placeholder::Site => "site",
            Placeholder::Fabric => "fabric",
            Placeholder::Region => "region",
            Placeholder::RegionUpper => "REGION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierTemplate {
    source: String,
    parts: Vec<Part>,
}

/// Values available to a template. The region is derived, never given.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub site: Option<String>,
    pub fabric: Option<String>,
    pub device: Option<String>,
}

impl TemplateVars {
    pub fn for_site(site: impl Into<String>, fabric: impl Into<String>) -> Self {
        Self {
            site: Some(site.into()),
            fabric: Some(fabric.into()),
            device: None,
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Leading letters of the site, or of the device when no site is set.
    pub fn region(&self) -> Option<String> {
        let from = self.site.as_deref().or(self.device.as_deref())?;
        let region: String = from
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        (!region.is_empty()).then_some(region)
    }

    fn value(&self, placeholder: Placeholder) -> Option<String> {
        match placeholder {
            Placeholder::Device => self.device.clone(),
            Placeholder::Site => self.site.clone(),
            Placeholder::Fabric => self.fabric.clone(),
            Placeholder::Region => self.region(),
            Placeholder::RegionUpper => self.region().map(|r| r.to_uppercase()),
        }
    }
}

impl IdentifierTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unterminated(source.to_string()))?;
            let name = &after[..close];
            let placeholder = Placeholder::from_name(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            parts.push(Part::Var(placeholder));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn uses_device(&self) -> bool {
        self.parts.contains(&Part::Var(Placeholder::Device))
    }

    pub fn render(&self, vars: &TemplateVars) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len() + 16);
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Var(placeholder) => {
                    let value = vars
                        .value(*placeholder)
                        .ok_or(TemplateError::MissingValue(placeholder.name()))?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

impl FromStr for IdentifierTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IdentifierTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
