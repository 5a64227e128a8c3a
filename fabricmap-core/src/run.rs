use crate::config::{DiscoverySettings, Variant};
use crate::error::ConfigError;
use fabricmap_scanner::{
    CancelToken, DeviceStatus, Discovery, DiscoveryEngine, DiscoveryError, DocumentLocator,
    DocumentSource, ProgressCallback, RoleTable, TemplateVars,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Options for a single discovery run
pub struct DiscoveryOptions {
    pub root: String,
    pub settings: DiscoverySettings,
    pub roles: RoleTable,
    pub show_progress_bars: bool,
}

/// Resolve the root device name and document locator of a variant for one site.
pub fn locate(
    variant: &Variant,
    site: &str,
    fabric: &str,
) -> Result<(String, DocumentLocator), ConfigError> {
    let vars = TemplateVars::for_site(site, fabric);
    let root = variant.root.render(&vars)?;
    let locator = DocumentLocator::new(variant.document.clone(), vars, variant.format);
    Ok((root, locator))
}

/// Execute a discovery against `source`.
///
/// Every status change goes to `progress_callback` when one is given; the
/// spinner is driven from the same stream of events.
pub async fn execute_discovery<S: DocumentSource>(
    source: S,
    options: DiscoveryOptions,
    cancel: CancelToken,
    progress_callback: Option<ProgressCallback>,
) -> Result<Discovery, DiscoveryError> {
    let DiscoveryOptions {
        root,
        settings,
        roles,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Discovering from {}...", root));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let expanded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let internal_callback: ProgressCallback = {
        let pb = progress_bar.clone();
        let expanded = expanded.clone();
        let failed = failed.clone();
        Arc::new(move |device: &str, status: &DeviceStatus| {
            match status {
                DeviceStatus::Expanded => {
                    expanded.fetch_add(1, Ordering::Relaxed);
                }
                DeviceStatus::Failed(_) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
            if let Some(ref pb) = pb
                && *status == DeviceStatus::Fetching
            {
                pb.set_message(format!(
                    "Discovering... {} expanded, {} failed, fetching {}",
                    expanded.load(Ordering::Relaxed),
                    failed.load(Ordering::Relaxed),
                    device
                ));
            }
            if let Some(ref callback) = progress_callback {
                callback(device, status);
            }
        })
    };

    let mut engine = DiscoveryEngine::new(source, roles)
        .with_mode(settings.mode)
        .with_concurrency(settings.concurrency)
        .with_cancel_token(cancel)
        .with_progress_callback(internal_callback);
    if let Some(limit) = settings.fetch_timeout() {
        engine = engine.with_fetch_timeout(limit);
    }
    if let Some(depth) = settings.max_depth {
        engine = engine.with_max_depth(depth);
    }

    let result = engine.discover(&root).await;

    if let Some(pb) = progress_bar {
        match &result {
            Ok(discovery) if discovery.cancelled => pb.finish_with_message(format!(
                "Discovery cancelled after {} fetches",
                discovery.fetch_count
            )),
            Ok(discovery) => pb.finish_with_message(format!(
                "Discovery complete: {} devices, {} fetches",
                discovery.devices.len(),
                discovery.fetch_count
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    if let Ok(ref discovery) = result {
        info!(
            "Discovery from {} finished: {} devices, {} records, {} failed",
            discovery.root,
            discovery.devices.len(),
            discovery.records.len(),
            failed.load(Ordering::Relaxed)
        );
    }

    result
}
