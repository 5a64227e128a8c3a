//! Device name normalization, sibling grouping and locality extraction.

use crate::model::Locality;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static SHARD_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)-b\d+$").unwrap());
static SIBLING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-([a-z])(\d+)$").unwrap());
static LOCALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)(\d+)-(\d+)(?:-|$)").unwrap());

/// Strip brick/shard suffixes and reject names that cannot identify a device.
///
/// `nrt12-56-es-c1-b4` and `nrt12-56-es-c1-b7` both map to `nrt12-56-es-c1`.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(raw: &str) -> Option<String> {
    let mut name = raw.trim().to_lowercase();
    while let Some(stripped) = SHARD_SUFFIX
        .captures(&name)
        .map(|caps| caps[1].to_string())
    {
        name = stripped;
    }

    if name.is_empty() || !name.chars().all(is_name_char) {
        return None;
    }
    Some(name)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | ':' | '/')
}

/// Parse `(region, zone, datacenter)` from the leading `<region><n>-<dc>-` segment.
pub fn locality(name: &str) -> Locality {
    match LOCALITY.captures(name) {
        Some(caps) => Locality::Known {
            region: caps[1].to_string(),
            zone: format!("{}{}", &caps[1], &caps[2]),
            datacenter: caps[3].to_string(),
        },
        None => Locality::Unknown,
    }
}

/// Rules for folding redundant siblings (`-r1`/`-r2`) into one display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiblingRules {
    /// Index letters eligible for folding.
    pub fold_prefixes: Vec<String>,
    /// Index letters that are never folded even when a full set is present.
    pub keep_separate: Vec<String>,
    /// Exact number of siblings required before a set is folded.
    pub pair_size: usize,
}

impl Default for SiblingRules {
    fn default() -> Self {
        Self {
            fold_prefixes: vec!["r".to_string(), "v".to_string()],
            keep_separate: vec!["v".to_string()],
            pair_size: 2,
        }
    }
}

impl SiblingRules {
    fn folds(&self, letter: &str) -> bool {
        self.fold_prefixes.iter().any(|p| p == letter)
            && !self.keep_separate.iter().any(|p| p == letter)
    }
}

/// Map every canonical name to its display group.
///
/// Siblings merge only when exactly `pair_size` of them are present, so a
/// lone `site-r1` keeps its own name.
pub fn group<'a, I>(names: I, rules: &SiblingRules) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: BTreeSet<&str> = names.into_iter().collect();
    let mut mapping = BTreeMap::new();
    let mut buckets: BTreeMap<(String, String), Vec<(&str, String)>> = BTreeMap::new();

    for &name in &names {
        match SIBLING.captures(name) {
            Some(caps) if rules.folds(&caps[2]) => {
                buckets
                    .entry((caps[1].to_string(), caps[2].to_string()))
                    .or_default()
                    .push((name, caps[3].to_string()));
            }
            _ => {
                mapping.insert(name.to_string(), name.to_string());
            }
        }
    }

    for ((base, letter), mut members) in buckets {
        members.sort_by(|a, b| a.1.cmp(&b.1));
        match folded_label(&base, &letter, &members, rules.pair_size) {
            Some(label) => {
                for (name, _) in &members {
                    mapping.insert(name.to_string(), label.clone());
                }
            }
            None => {
                for (name, _) in &members {
                    mapping.insert(name.to_string(), name.to_string());
                }
            }
        }
    }

    mapping
}

fn folded_label(
    base: &str,
    letter: &str,
    members: &[(&str, String)],
    pair_size: usize,
) -> Option<String> {
    if pair_size < 2 || members.len() != pair_size {
        return None;
    }

    let width = members[0].1.len();
    if members.iter().any(|(_, idx)| idx.len() != width) {
        return None;
    }
    let prefix = &members[0].1[..width - 1];
    if members.iter().any(|(_, idx)| &idx[..width - 1] != prefix) {
        return None;
    }

    let lasts: String = members.iter().map(|(_, idx)| &idx[width - 1..]).collect();
    Some(format!("{base}-{letter}{prefix}[{lasts}]"))
}
