// Tests for config file loading

use fabricmap_core::config::Config;
use fabricmap_core::error::ConfigError;
use fabricmap_core::graph::Category;
use fabricmap_core::run::locate;
use fabricmap_scanner::{DocumentFormat, ExpansionMode, Role};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_empty_file_keeps_defaults() {
    let config = Config::from_toml("").unwrap();

    assert_eq!(config.discovery.concurrency, 4);
    assert_eq!(config.discovery.mode, ExpansionMode::Pruned);
    assert_eq!(config.discovery.timeout_secs, 30);
    assert_eq!(config.grouping.pair_size, 2);
    assert_eq!(config.layout.columns, 4);
    assert_eq!(config.variants.len(), 3);
    assert_eq!(config.styles.fill(Category::Root), "#FFE6CC");
}

#[test]
fn test_builtin_variant_locations() {
    let config = Config::builtin().unwrap();

    let (root, locator) = locate(config.variant("ec2").unwrap(), "nrt12-12", "es-c1").unwrap();
    assert_eq!(root, "nrt12-12-es-c1");
    assert_eq!(
        locator.identifier(&root).unwrap(),
        "site-configs/nrt12-12-es-c1.yaml"
    );

    let umn = config.variant("umn").unwrap();
    assert_eq!(umn.format, DocumentFormat::NodeInterfaces);
    let (root, locator) = locate(umn, "bjs11-11", "es-mgmt-cor").unwrap();
    assert_eq!(root, "bjs11-11-es-mgmt-cor-r1");
    assert_eq!(
        locator.identifier(&root).unwrap(),
        "brick/EC2-BJS/bjs-es-mgmt-cor.brick"
    );
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn test_full_file() {
    let text = r##"
exclude_roles = ["firewall"]

[discovery]
concurrency = 8
mode = "full"
max_depth = 3
timeout_secs = 10
source = "https://configs.example.net/"

[grouping]
fold_prefixes = ["r"]
keep_separate = []
pair_size = 2

[layout]
columns = 6

[[roles]]
role = "transit"
type_tags = ["transit"]
name_patterns = ["-tt-acc"]
include = true

[styles]
inter-zone = { fill = "#000000", stroke = "#FF0000" }

[[variants]]
name = "lab"
format = "attributes"
root = "{site}-{fabric}"
document = "lab/{device}.attr"
mode = "root-only"
"##;
    let config = Config::from_toml(text).unwrap();

    assert_eq!(config.discovery.concurrency, 8);
    assert_eq!(config.discovery.mode, ExpansionMode::Full);
    assert_eq!(config.discovery.max_depth, Some(3));
    assert_eq!(
        config.discovery.source.as_deref(),
        Some("https://configs.example.net/")
    );
    assert_eq!(config.exclude_roles, vec![Role::Firewall]);
    assert!(config.grouping.keep_separate.is_empty());
    assert_eq!(config.layout.columns, 6);
    assert_eq!(config.layout.x_spacing, 300.0);
    assert!(config.roles.is_included(Role::Transit));
    assert!(!config.roles.is_included(Role::Service));
    assert_eq!(config.styles.stroke(Category::InterZone), "#FF0000");
    assert_eq!(config.styles.stroke(Category::Local), "#009900");

    let lab = config.variant("lab").unwrap();
    assert_eq!(lab.format, DocumentFormat::Attributes);
    assert_eq!(lab.mode, Some(ExpansionMode::RootOnly));
    assert_eq!(config.variants.len(), 4);
    assert_eq!(config.build_options().exclude_roles, vec![Role::Firewall]);
}

#[test]
fn test_variant_override_replaces_builtin() {
    let text = r#"
[[variants]]
name = "ec2"
format = "neighbor-list"
root = "{site}-{fabric}"
document = "v2/{device}.yml"
"#;
    let config = Config::from_toml(text).unwrap();
    assert_eq!(config.variants.len(), 3);
    assert_eq!(
        config.variant("ec2").unwrap().document.as_str(),
        "v2/{device}.yml"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_category() {
    let result = Config::from_toml("[styles]\npurple = { fill = \"#1\", stroke = \"#2\" }\n");
    assert!(matches!(
        result,
        Err(ConfigError::Unknown { kind: "category", .. })
    ));
}

#[test]
fn test_bad_template_placeholder() {
    let text = r#"
[[variants]]
name = "bad"
format = "attributes"
root = "{site}-{rack}"
document = "{device}"
"#;
    assert!(matches!(
        Config::from_toml(text),
        Err(ConfigError::Template(_))
    ));
}

#[test]
fn test_unknown_mode_and_format() {
    assert!(matches!(
        Config::from_toml("[discovery]\nmode = \"sideways\"\n"),
        Err(ConfigError::Unknown { kind: "expansion mode", .. })
    ));
    let text = "[[variants]]\nname = \"x\"\nformat = \"csv\"\nroot = \"{site}\"\ndocument = \"{device}\"\n";
    assert!(matches!(
        Config::from_toml(text),
        Err(ConfigError::Unknown { kind: "document format", .. })
    ));
}

#[test]
fn test_invalid_toml() {
    assert!(matches!(
        Config::from_toml("[discovery\n"),
        Err(ConfigError::Toml(_))
    ));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fabricmap.toml");
    fs::write(&path, "[discovery]\nconcurrency = 2\n").unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.discovery.concurrency, 2);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(
        Config::load(path.to_str().unwrap()),
        Err(ConfigError::Io { .. })
    ));
}
