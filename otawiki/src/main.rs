//! # otawiki
//!
//! A CLI tool for turning an OTA software-update catalog into wiki table
//! markup or a plain text report.
//!
//! ## Overview
//!
//! otawiki is built on top of otawikilib and provides a command-line
//! interface for querying a downloaded update catalog: pick a device (and
//! board model where the catalog splits by board), optionally bound the
//! version range, and choose the output renderer.
//!
//! ## Usage
//!
//! ```bash
//! # Plain report of every public release for a device
//! otawiki catalog.json --device iPhone6,1
//!
//! # Wiki rows, betas included
//! otawiki catalog.json --device iPhone6,1 --beta --wiki
//!
//! # A complete wiki table for one version window
//! otawiki catalog.json -d iPad6,11 -m J71sAP --min 10.0 --max 10.3.3 -w --full-table
//!
//! # Drop stub entries that are not deliverable updates
//! otawiki catalog.json -d iPhone8,1 -m N71AP --remove-stubs
//! ```

use std::fs;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::Style;
use otawikilib::{report, Criteria, OtaError, OutputMode, RawRecord, Version};
use serde::Deserialize;

/// The on-disk shape the catalog loader produces: one `Assets` array with
/// an entry per firmware build.
#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(rename = "Assets")]
    assets: Vec<RawRecord>,
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("otawiki")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders an OTA update catalog as wiki table markup or a plain report")
        .arg(
            Arg::new("catalog")
                .help("Path to the downloaded catalog (JSON)")
                .required(true),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .required(true)
                .help("Device identifier to search for (e.g. iPhone8,1)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .help("Board model identifier (e.g. N71AP); required for devices whose entries are split by board"),
        )
        .arg(
            Arg::new("min")
                .long("min")
                .help("Lowest marketing version to include"),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .help("Highest marketing version to include"),
        )
        .arg(
            Arg::new("beta")
                .short('b')
                .long("beta")
                .action(ArgAction::SetTrue)
                .help("Include beta, carrier, and internal releases"),
        )
        .arg(
            Arg::new("remove-stubs")
                .short('r')
                .long("remove-stubs")
                .action(ArgAction::SetTrue)
                .help("Drop entries that are not deliverable updates"),
        )
        .arg(
            Arg::new("wiki")
                .short('w')
                .long("wiki")
                .action(ArgAction::SetTrue)
                .help("Emit wiki table markup instead of the plain report"),
        )
        .arg(
            Arg::new("full-table")
                .short('f')
                .long("full-table")
                .action(ArgAction::SetTrue)
                .requires("wiki")
                .help("Wrap the wiki rows in a complete table with a header"),
        )
}

fn build_criteria(matches: &ArgMatches) -> Result<Criteria> {
    let device = matches
        .get_one::<String>("device")
        .map(String::as_str)
        .unwrap_or("");
    let mut criteria = Criteria::new(device)
        .include_beta(matches.get_flag("beta"))
        .remove_stubs(matches.get_flag("remove-stubs"));

    if let Some(model) = matches.get_one::<String>("model") {
        criteria = criteria.model(model);
    }
    if let Some(min) = matches.get_one::<String>("min") {
        criteria = criteria.minimum(Version::parse(min)?);
    }
    if let Some(max) = matches.get_one::<String>("max") {
        criteria = criteria.maximum(Version::parse(max)?);
    }

    Ok(criteria)
}

fn load_catalog(path: &str) -> Result<Vec<RawRecord>> {
    let text = fs::read_to_string(path)
        .map_err(|err| OtaError::SourceUnavailable(format!("{path}: {err}")))?;

    let catalog: Catalog =
        serde_json::from_str(&text).map_err(|err| OtaError::SourceFormat(err.to_string()))?;

    Ok(catalog.assets)
}

fn run(matches: &ArgMatches) -> Result<String> {
    let criteria = build_criteria(matches)?;
    let path = matches
        .get_one::<String>("catalog")
        .map(String::as_str)
        .unwrap_or("");
    let raw = load_catalog(path)?;

    let mode = if matches.get_flag("wiki") {
        OutputMode::Wiki
    } else {
        OutputMode::Plain
    };

    Ok(report(&raw, &criteria, mode, matches.get_flag("full-table"))?)
}

fn main() -> ExitCode {
    env_logger::init();

    let matches = build_command().get_matches();

    match run(&matches) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let label = Style::new().red().bold();
            eprintln!("{} {err}", label.apply_to("error:"));
            ExitCode::FAILURE
        }
    }
}
