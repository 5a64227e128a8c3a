use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use fabricmap_core::config::{self, Config, DiscoverySettings, expand_path};
use fabricmap_core::graph::{BuildOptions, Topology, build};
use fabricmap_core::render::{DiagramDocument, render};
use fabricmap_core::report::{self, ReportFormat, Summary};
use fabricmap_core::run::{DiscoveryOptions, execute_discovery, locate};
use fabricmap_core::validate::{Problem, validate};
use fabricmap_scanner::{
    CancelToken, DirectorySource, Discovery, DiscoveryEngine, DocumentFormat, DocumentLocator,
    ExpansionMode, HttpSource, MemorySource, adapter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Where the documents of a fabric are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Http(Url),
    Directory(PathBuf),
}

/// `http(s)://` locations are fetched over HTTP; anything else is a directory.
pub fn source_kind(source: &str) -> SourceKind {
    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => SourceKind::Http(url),
        _ => SourceKind::Directory(expand_path(source)),
    }
}

pub fn load_config(path: Option<&String>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path)),
        None => Ok(Config::builtin()?),
    }
}

/// Default diagram location: `<root>.drawio` in the working directory.
pub fn output_path(explicit: Option<&PathBuf>, root: &str) -> PathBuf {
    match explicit {
        Some(path) => expand_path(&path.to_string_lossy()),
        None => PathBuf::from(format!("{}.drawio", root.replace(['/', '[', ']'], "_"))),
    }
}

pub fn write_diagram(diagram: &DiagramDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, diagram.to_xml())
        .with_context(|| format!("writing diagram {}", path.display()))?;
    debug!("Wrote diagram to {}", path.display());
    Ok(())
}

/// Parse and check a draw.io file on disk.
pub fn validate_file(path: &Path) -> Result<Vec<Problem>> {
    let xml = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let diagram = DiagramDocument::from_xml(&xml)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(validate(&diagram))
}

/// Apply command-line overrides on top of the config file and variant.
pub fn discovery_settings(
    config: &Config,
    variant_mode: Option<ExpansionMode>,
    args: &ArgMatches,
) -> Result<DiscoverySettings> {
    let mut settings = config.discovery.clone();
    if let Some(mode) = variant_mode {
        settings.mode = mode;
    }
    if let Some(mode) = args.get_one::<String>("mode") {
        settings.mode = config::parse_mode(mode)?;
    }
    if let Some(concurrency) = args.get_one::<usize>("concurrency") {
        settings.concurrency = (*concurrency).max(1);
    }
    if let Some(depth) = args.get_one::<usize>("max-depth") {
        settings.max_depth = Some(*depth);
    }
    if let Some(secs) = args.get_one::<u64>("timeout") {
        settings.timeout_secs = *secs;
    }
    if let Some(source) = args.get_one::<String>("source") {
        settings.source = Some(source.clone());
    }
    Ok(settings)
}

fn apply_exclusions(config: &mut Config, args: &ArgMatches) -> Result<()> {
    if let Some(roles) = args.get_many::<String>("exclude-role") {
        for role in roles {
            config.exclude_roles.push(config::parse_role(role)?);
        }
    }
    Ok(())
}

/// Parse one document offline and expand only it.
pub async fn discover_document(
    body: &str,
    format: DocumentFormat,
    root: Option<&str>,
    config: &Config,
) -> Result<Discovery> {
    let root = match root {
        Some(root) => root.to_string(),
        None => adapter::self_identity(body, format)
            .ok_or_else(|| anyhow!("document names no device; pass --root"))?,
    };
    let source = MemorySource::new().with_document(root.clone(), format, body);
    let discovery = DiscoveryEngine::new(source, config.roles.clone())
        .with_mode(ExpansionMode::RootOnly)
        .discover(&root)
        .await?;
    Ok(discovery)
}

/// Build, render, write and check the diagram of a finished discovery.
pub fn emit_diagram(
    discovery: &Discovery,
    config: &Config,
    mut options: BuildOptions,
    args: &ArgMatches,
    quiet: bool,
) -> Result<Vec<Problem>> {
    options.site_scoped |= args.get_flag("site-scoped");
    let topology = build(discovery, &options);
    let mut diagram = render(&topology, &config.styles, &config.layout);
    if args.get_flag("timestamp") {
        diagram = diagram.with_modified(chrono::Utc::now().to_rfc3339());
    }
    let problems = validate(&diagram);

    let path = output_path(args.get_one::<PathBuf>("output"), &topology.root);
    write_diagram(&diagram, &path)?;

    let summary = Summary::new(discovery, &topology, &problems);
    if let Some(report_path) = args.get_one::<PathBuf>("report") {
        let format = args
            .get_one::<String>("report-format")
            .and_then(|f| ReportFormat::from_str(f))
            .unwrap_or(ReportFormat::Text);
        let content = report::generate(&summary, format)?;
        let report_path = expand_path(&report_path.to_string_lossy());
        report::save_report(&content, &report_path)
            .with_context(|| format!("writing report {}", report_path.display()))?;
        if !quiet {
            println!(
                "{} Report: {}",
                "✓".green().bold(),
                report_path.display().to_string().bright_white()
            );
        }
    }

    if !quiet {
        print_result(&topology, &summary, &path);
    }
    for problem in &problems {
        eprintln!("{} {}", "✗".red().bold(), problem);
    }
    Ok(problems)
}

fn print_result(topology: &Topology, summary: &Summary, path: &Path) {
    println!();
    if topology.partial {
        println!(
            "{} Discovery was cancelled; the diagram is partial",
            "⚠".yellow().bold()
        );
    }
    println!(
        "{} {} nodes, {} edges from {} ({} fetches)",
        "✓".green().bold(),
        summary.nodes.to_string().cyan(),
        summary.edges.to_string().cyan(),
        summary.root.bright_white(),
        summary.fetch_count
    );
    for (category, count) in &summary.nodes_by_category {
        println!("  {} {:<14} {}", "•".blue(), category, count);
    }
    if !summary.failed.is_empty() {
        println!(
            "{} {} device(s) without configuration:",
            "⚠".yellow().bold(),
            summary.failed.len()
        );
        for device in &summary.failed {
            println!("  {} {} ({})", "•".yellow(), device.name, device.reason.dimmed());
        }
    }
    println!(
        "{} Diagram: {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
}

fn finish(problems: Vec<Problem>) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        bail!("diagram has {} validation problem(s)", problems.len())
    }
}

fn spawn_interrupt_handler(token: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing the current fetch wave");
            token.cancel();
        }
    });
}

pub async fn handle_discover(args: &ArgMatches, config_path: Option<&String>, quiet: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_exclusions(&mut config, args)?;

    let variant_name = args
        .get_one::<String>("variant")
        .map(String::as_str)
        .unwrap_or("ec2");
    let variant = config.variant(variant_name)?.clone();
    let settings = discovery_settings(&config, variant.mode, args)?;

    let site = args
        .get_one::<String>("site")
        .ok_or_else(|| anyhow!("--site is required"))?;
    let fabric = args
        .get_one::<String>("fabric")
        .ok_or_else(|| anyhow!("--fabric is required"))?;
    let (mut root, locator) = locate(&variant, site, fabric)?;
    if let Some(explicit) = args.get_one::<String>("root") {
        root = explicit.clone();
    }

    let location = settings.source.clone().ok_or_else(|| {
        anyhow!("no document source: pass --source or set discovery.source in the config file")
    })?;

    if !quiet {
        println!(
            "{} Discovering {} ({} variant, {} mode)",
            "→".blue(),
            root.bright_white(),
            variant.name,
            settings.mode.as_str()
        );
        println!("{} Documents: {}", "→".blue(), location);
    }

    let token = CancelToken::new();
    spawn_interrupt_handler(token.clone());

    let timeout_secs = settings.timeout_secs;
    let options = DiscoveryOptions {
        root,
        settings,
        roles: config.roles.clone(),
        show_progress_bars: !quiet,
    };
    let discovery = match source_kind(&location) {
        SourceKind::Http(url) => {
            let source = HttpSource::new(url.as_str(), locator, timeout_secs)?;
            execute_discovery(source, options, token, None).await?
        }
        SourceKind::Directory(dir) => {
            let source = DirectorySource::new(dir, locator);
            execute_discovery(source, options, token, None).await?
        }
    };

    let build_options = variant.build_options(&config);
    finish(emit_diagram(&discovery, &config, build_options, args, quiet)?)
}

pub async fn handle_parse(args: &ArgMatches, config_path: Option<&String>, quiet: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_exclusions(&mut config, args)?;

    let file = args
        .get_one::<PathBuf>("FILE")
        .ok_or_else(|| anyhow!("a document path is required"))?;
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("neighbor-list");
    let format = DocumentFormat::from_name(format_name)
        .ok_or_else(|| anyhow!("unknown document format {:?}", format_name))?;

    let path = expand_path(&file.to_string_lossy());
    let body = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;

    let discovery = discover_document(
        &body,
        format,
        args.get_one::<String>("root").map(String::as_str),
        &config,
    )
    .await?;

    finish(emit_diagram(&discovery, &config, config.build_options(), args, quiet)?)
}

pub fn handle_validate(args: &ArgMatches, quiet: bool) -> Result<()> {
    let file = args
        .get_one::<PathBuf>("FILE")
        .ok_or_else(|| anyhow!("a diagram path is required"))?;
    let path = expand_path(&file.to_string_lossy());
    let problems = validate_file(&path)?;

    for problem in &problems {
        eprintln!("{} {}", "✗".red().bold(), problem);
    }
    if problems.is_empty() && !quiet {
        println!(
            "{} {} is valid",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
    finish(problems)
}

/// Print the root device and where its document would be read from.
pub fn handle_urls(args: &ArgMatches, config_path: Option<&String>) -> Result<()> {
    let config = load_config(config_path)?;
    let site = args
        .get_one::<String>("site")
        .ok_or_else(|| anyhow!("--site is required"))?;
    let fabric = args
        .get_one::<String>("fabric")
        .ok_or_else(|| anyhow!("--fabric is required"))?;
    let source = args
        .get_one::<String>("source")
        .cloned()
        .or_else(|| config.discovery.source.clone());

    let names: Vec<String> = match args.get_one::<String>("variant") {
        Some(name) => vec![name.clone()],
        None => config.variants.iter().map(|v| v.name.clone()).collect(),
    };
    for name in names {
        let variant = config.variant(&name)?;
        let (root, locator) = locate(variant, site, fabric)?;
        let location = document_location(source.as_deref(), &locator, &root)?;
        println!(
            "{:<6} {:<16} {} {}",
            variant.name.cyan(),
            variant.format.as_str(),
            root.bright_white(),
            location
        );
    }
    Ok(())
}

/// The full URL or path of a device's document under `source`, or the bare identifier.
pub fn document_location(
    source: Option<&str>,
    locator: &DocumentLocator,
    device: &str,
) -> Result<String> {
    let location = match source.map(source_kind) {
        Some(SourceKind::Http(url)) => HttpSource::new(url.as_str(), locator.clone(), 30)?
            .url_for(device)?
            .to_string(),
        Some(SourceKind::Directory(dir)) => DirectorySource::new(dir, locator.clone())
            .path_for(device)?
            .display()
            .to_string(),
        None => locator.identifier(device)?,
    };
    Ok(location)
}

pub fn print_banner() {
    println!(
        "{} {}",
        "fabricmap".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
