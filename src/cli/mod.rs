use std::collections::HashSet;
use std::fs::canonicalize;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use itertools::Itertools;

use crate::characterize::CactiEngine;
use crate::cli::args::Args;
use crate::config::{parse_config, ProcessKind};
use crate::plan::{generate_all, TaskKey};
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
   __       _
  / _| __ _| | _____ _ __ __ _ _ __ ___
 | |_ / _` | |/ / _ \ '__/ _` | '_ ` _ \
 |  _| (_| |   <  __/ | | (_| | | | | | |
 |_|  \__,_|_|\_\___|_|  \__,_|_| |_| |_|

FAKERAM v0.2
";

/// Views selected on the command line, or every view if none was.
pub fn selected_tasks(args: &Args) -> HashSet<TaskKey> {
    let tasks: HashSet<TaskKey> = [
        (args.lef, TaskKey::GenerateLef),
        (args.lib, TaskKey::GenerateLib),
        (args.verilog, TaskKey::GenerateVerilog),
        (args.all, TaskKey::All),
    ]
    .into_iter()
    .filter_map(|(a, b)| if a { Some(b) } else { None })
    .collect();

    if tasks.is_empty() {
        HashSet::from([TaskKey::All])
    } else {
        tasks
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)
        .with_context(|| format!("configuration file {:?} not found", args.config))?;

    println!("{BANNER}");

    println!("Reading configuration file...\n");
    let config = parse_config(&config_path)?;

    let process = &config.process;
    println!("Configuration file: {:?}", &config_path);
    println!("Process parameters:");
    println!("\tTechnology node: {} nm", process.tech_nm);
    println!("\tMetal prefix: {}", process.metal_prefix);
    println!("\tVoltage: {} V", process.voltage);
    println!(
        "\tMemories: {}",
        config.memories.iter().map(|m| m.name.as_str()).join(", ")
    );
    println!();

    let cacti_dir = match (&process.kind, args.cacti_dir.clone()) {
        (ProcessKind::Engine, None) => {
            bail!("the CACTI directory must be given with --cacti-dir or CACTI_BUILD_DIR")
        }
        (_, dir) => dir.unwrap_or_default(),
    };
    let engine = CactiEngine::new(cacti_dir);
    let tasks = selected_tasks(&args);

    std::fs::create_dir_all(&args.output_dir)?;
    let output_dir = canonicalize(&args.output_dir)?;

    let outcomes = generate_all(&config, &engine, &output_dir, &tasks, true);
    let mut failed = Vec::new();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(_) => println!("Artifacts saved to: {:?}\n", &outcome.work_dir),
            Err(_) => failed.push(outcome.name.as_str()),
        }
    }

    if !failed.is_empty() {
        println!("{} {}", "Failed:".red().bold(), failed.iter().join(", "));
        bail!("{} of {} memories failed", failed.len(), outcomes.len());
    }

    Ok(())
}
