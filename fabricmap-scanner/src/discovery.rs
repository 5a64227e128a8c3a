use crate::adapter;
use crate::error::{DiscoveryError, FetchError, ParseError};
use crate::model::{ConnectionRecord, Device, DeviceStatus, Document, Locality, Role, RoleSource};
use crate::normalize::{locality, normalize};
use crate::roles::RoleTable;
use crate::source::DocumentSource;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(&str, &DeviceStatus) + Send + Sync>;

/// How far discovery expands beyond the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionMode {
    /// Different-zone neighbors whose edges are already known stay unfetched.
    #[default]
    Pruned,
    /// Every fetchable neighbor is fetched.
    Full,
    /// Only the root document is read; all neighbors become leaves.
    RootOnly,
}

impl ExpansionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionMode::Pruned => "pruned",
            ExpansionMode::Full => "full",
            ExpansionMode::RootOnly => "root-only",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pruned" => Some(ExpansionMode::Pruned),
            "full" => Some(ExpansionMode::Full),
            "root-only" | "root_only" => Some(ExpansionMode::RootOnly),
            _ => None,
        }
    }
}

/// Shared flag checked before every fetch wave.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a discovery run. Partial when `cancelled` is set, but always renderable.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub root: String,
    pub devices: BTreeMap<String, Device>,
    pub records: Vec<ConnectionRecord>,
    pub cancelled: bool,
    pub fetch_count: usize,
}

impl Discovery {
    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.missing_config())
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Device> {
        self.devices
            .values()
            .filter(|d| d.status == DeviceStatus::Leaf)
    }
}

/// Visited devices, pending queue and accumulated records. Owned by the loop only.
#[derive(Default)]
struct Frontier {
    devices: BTreeMap<String, Device>,
    pending: VecDeque<String>,
    records: Vec<ConnectionRecord>,
}

pub struct DiscoveryEngine<S> {
    source: S,
    roles: RoleTable,
    mode: ExpansionMode,
    concurrency: usize,
    max_depth: Option<usize>,
    fetch_timeout: Option<Duration>,
    progress_callback: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl<S: DocumentSource> DiscoveryEngine<S> {
    pub fn new(source: S, roles: RoleTable) -> Self {
        Self {
            source,
            roles,
            mode: ExpansionMode::default(),
            concurrency: 4,
            max_depth: None,
            fetch_timeout: None,
            progress_callback: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExpansionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Devices deeper than `depth` hops from the root are kept as leaves.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn discover(&self, root: &str) -> Result<Discovery, DiscoveryError> {
        let root_name =
            normalize(root).ok_or_else(|| DiscoveryError::InvalidRoot(root.to_string()))?;
        let (role, role_source) = self.roles.resolve(&root_name, None);
        if !self.roles.is_fetchable(role) {
            return Err(DiscoveryError::RootNotFetchable(root_name));
        }

        info!(
            "Starting discovery from {} ({} mode, concurrency {})",
            root_name,
            self.mode.as_str(),
            self.concurrency
        );

        let mut frontier = Frontier::default();
        frontier.devices.insert(
            root_name.clone(),
            self.new_device(&root_name, root.trim(), role, role_source, 0),
        );
        frontier.pending.push_back(root_name.clone());
        self.notify(&root_name, &DeviceStatus::Queued);

        let mut fetch_count = 0;
        let mut cancelled = false;

        while !frontier.pending.is_empty() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Discovery cancelled with {} devices still pending",
                    frontier.pending.len()
                );
                cancelled = true;
                break;
            }

            let mut wave = Vec::with_capacity(self.concurrency);
            while wave.len() < self.concurrency {
                let Some(name) = frontier.pending.pop_front() else {
                    break;
                };
                // A declared role seen after queueing may have removed the config.
                let fetchable = frontier
                    .devices
                    .get(&name)
                    .is_some_and(|d| d.has_fetchable_config);
                if !fetchable {
                    debug!("Skipping fetch of {}: role has no configuration", name);
                    self.transition(&mut frontier, &name, DeviceStatus::Expanded);
                    continue;
                }
                self.transition(&mut frontier, &name, DeviceStatus::Fetching);
                wave.push(name);
            }
            if wave.is_empty() {
                continue;
            }

            debug!("Fetching wave of {} devices", wave.len());
            let results: Vec<Result<Document, FetchError>> = stream::iter(wave.iter())
                .map(|name| self.fetch_one(name))
                .buffered(self.concurrency)
                .collect()
                .await;
            fetch_count += wave.len();

            for (name, result) in wave.iter().zip(results) {
                let outcome = match result {
                    Ok(document) => self
                        .expand(&mut frontier, name, document)
                        .map_err(|e| format!("unparseable document: {e}")),
                    // Only a root that cannot be fetched at all ends the run.
                    Err(e) if *name == root_name => {
                        return Err(DiscoveryError::RootUnavailable {
                            device: root_name,
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => Err(e.to_string()),
                };

                if let Err(reason) = outcome {
                    warn!("Device {} failed: {}", name, reason);
                    self.transition(&mut frontier, name, DeviceStatus::Failed(reason));
                }
            }
        }

        info!(
            "Discovery finished: {} devices, {} records, {} fetches",
            frontier.devices.len(),
            frontier.records.len(),
            fetch_count
        );

        Ok(Discovery {
            root: root_name,
            devices: frontier.devices,
            records: frontier.records,
            cancelled,
            fetch_count,
        })
    }

    async fn fetch_one(&self, name: &str) -> Result<Document, FetchError> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.source.fetch(name))
                .await
                .map_err(|_| FetchError::Timeout {
                    identifier: name.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => self.source.fetch(name).await,
        }
    }

    fn expand(
        &self,
        frontier: &mut Frontier,
        name: &str,
        document: Document,
    ) -> Result<(), ParseError> {
        let parsed = adapter::parse(&document.body, document.format, name, &self.roles)?;
        self.transition(frontier, name, DeviceStatus::Parsed);

        if let Some(identity) = parsed.self_identity.as_deref().and_then(normalize)
            && identity != name
        {
            warn!(
                "Document {} describes {}, expected {}; keeping {}",
                document.identifier, identity, name, name
            );
        }

        let (depth, current_locality) = match frontier.devices.get(name) {
            Some(device) => (device.depth, device.locality.clone()),
            None => (0, Locality::Unknown),
        };
        let known: HashSet<String> = frontier.devices.keys().cloned().collect();

        let mut fresh = Vec::new();
        for record in &parsed.records {
            for (endpoint, is_target) in [(&record.source, false), (&record.target, true)] {
                let declared = parsed
                    .declared_roles
                    .get(endpoint)
                    .copied()
                    .or(if is_target { record.declared_role } else { None });
                let raw = parsed.raw_names.get(endpoint).map(String::as_str);
                if self.ingest(frontier, endpoint, raw, declared, depth + 1) {
                    fresh.push(endpoint.clone());
                }
            }
        }
        for (device, role) in &parsed.declared_roles {
            if frontier.devices.contains_key(device) {
                self.ingest(frontier, device, None, Some(*role), depth + 1);
            }
        }
        debug!(
            "{}: {} records, {} new devices",
            name,
            parsed.records.len(),
            fresh.len()
        );
        frontier.records.extend(parsed.records);

        for device in fresh {
            if self.should_fetch(frontier, &device, &current_locality, &known) {
                self.transition(frontier, &device, DeviceStatus::Queued);
                frontier.pending.push_back(device);
            } else {
                self.transition(frontier, &device, DeviceStatus::Leaf);
            }
        }

        self.transition(frontier, name, DeviceStatus::Expanded);
        Ok(())
    }

    /// Record a referenced device. Returns true when the name is new.
    fn ingest(
        &self,
        frontier: &mut Frontier,
        name: &str,
        raw: Option<&str>,
        declared: Option<Role>,
        depth: usize,
    ) -> bool {
        if let Some(device) = frontier.devices.get_mut(name) {
            if let Some(role) = declared
                && device.role_source == RoleSource::Inferred
            {
                debug!("{}: declared role {} replaces {}", name, role, device.role);
                device.role = role;
                device.role_source = RoleSource::Declared;
                device.has_fetchable_config = self.roles.is_fetchable(role);
            }
            return false;
        }

        let (role, role_source) = self.roles.resolve(name, declared);
        frontier
            .devices
            .insert(
                name.to_string(),
                self.new_device(name, raw.unwrap_or(name), role, role_source, depth),
            );
        true
    }

    fn should_fetch(
        &self,
        frontier: &Frontier,
        name: &str,
        current_locality: &Locality,
        known: &HashSet<String>,
    ) -> bool {
        let Some(device) = frontier.devices.get(name) else {
            return false;
        };
        if !device.has_fetchable_config || self.mode == ExpansionMode::RootOnly {
            return false;
        }
        if self.max_depth.is_some_and(|max| device.depth > max) {
            return false;
        }
        if self.mode == ExpansionMode::Full || device.locality.same_zone(current_locality) {
            return true;
        }

        // Different or unknown zone: only worth a fetch if it leads somewhere new.
        let leads_elsewhere = frontier
            .records
            .iter()
            .filter_map(|r| r.other_end(name))
            .any(|other| !known.contains(other));
        if !leads_elsewhere {
            debug!("Pruning {}: every known edge ends in a visited device", name);
        }
        leads_elsewhere
    }

    fn new_device(
        &self,
        name: &str,
        raw: &str,
        role: Role,
        role_source: RoleSource,
        depth: usize,
    ) -> Device {
        Device {
            raw_name: raw.to_string(),
            canonical_name: name.to_string(),
            role,
            role_source,
            locality: locality(name),
            has_fetchable_config: self.roles.is_fetchable(role),
            status: DeviceStatus::Queued,
            depth,
        }
    }

    fn transition(&self, frontier: &mut Frontier, name: &str, status: DeviceStatus) {
        if let Some(device) = frontier.devices.get_mut(name) {
            device.status = status.clone();
        }
        self.notify(name, &status);
    }

    fn notify(&self, name: &str, status: &DeviceStatus) {
        if let Some(callback) = &self.progress_callback {
            callback(name, status);
        }
    }
}
