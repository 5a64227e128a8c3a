use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

const FORMATS: [&str; 3] = ["neighbor-list", "node-interfaces", "attributes"];
const MODES: [&str; 3] = ["pruned", "full", "root-only"];

fn site_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-s --"site" <SITE>)
            .required(true)
            .help("Site prefix, e.g. nrt12-12"),
    )
    .arg(
        arg!(-f --"fabric" <FABRIC>)
            .required(true)
            .help("Fabric name, e.g. es-c1"),
    )
    .arg(
        arg!(--"variant" <NAME>)
            .required(false)
            .help("Fabric variant from the config file (built-in: ec2, umn, dsn)"),
    )
    .arg(
        arg!(-S --"source" <URL_OR_DIR>)
            .required(false)
            .help("Base URL or directory holding the configuration documents"),
    )
}

fn diagram_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"root" <DEVICE>)
            .required(false)
            .help("Root device name (default: derived from the variant, or the document's own name)"),
    )
    .arg(
        arg!(-x --"exclude-role" <ROLE>)
            .required(false)
            .help("Leave devices of this role out of the diagram (repeatable)")
            .action(clap::ArgAction::Append),
    )
    .arg(
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Diagram file to write (default: <root>.drawio)")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"report" <PATH>)
            .required(false)
            .help("Also write a summary report to this file")
            .value_parser(clap::value_parser!(PathBuf)),
    )
    .arg(
        arg!(--"report-format" <FORMAT>)
            .required(false)
            .help("Report format: text, json")
            .value_parser(["text", "json"])
            .default_value("text"),
    )
    .arg(
        arg!(--"timestamp")
            .required(false)
            .help("Stamp the diagram with the current time (output is no longer reproducible)")
            .action(clap::ArgAction::SetTrue),
    )
    .arg(
        arg!(--"site-scoped")
            .required(false)
            .help("Draw only links with at least one end in the root's site")
            .action(clap::ArgAction::SetTrue),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("fabricmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("fabricmap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Debug logging (RUST_LOG overrides)").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("TOML config file with discovery settings, roles, styles and variants"),
        )
        .subcommand_required(false)
        .subcommand(diagram_args(site_args(
            command!("discover")
                .about(
                    "Recursively fetch configuration documents from a root device and draw the \
                fabric.",
                )
                .arg(
                    arg!(-m --"mode" <MODE>)
                        .required(false)
                        .help("Expansion mode (default: pruned, or the variant's own)")
                        .value_parser(MODES),
                )
                .arg(
                    arg!(-t --"concurrency" <NUM>)
                        .required(false)
                        .help("Documents fetched concurrently per wave")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Do not fetch devices further than this many hops from the root")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-document fetch timeout in seconds (0 disables)")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )))
        .subcommand(diagram_args(
            command!("parse")
                .about("Draw the neighbors of a single local document without fetching anything.")
                .arg(
                    arg!(<FILE>)
                        .help("Configuration document to read")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-F --"format" <FORMAT>)
                        .required(false)
                        .help("Document format")
                        .value_parser(FORMATS)
                        .default_value("neighbor-list"),
                ),
        ))
        .subcommand(
            command!("validate")
                .about("Check a draw.io file for dangling references, bad geometry and duplicate ids.")
                .arg(
                    arg!(<FILE>)
                        .help("Diagram to check")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(site_args(
            command!("urls").about("Print the root device and its document location for each variant."),
        ))
}
