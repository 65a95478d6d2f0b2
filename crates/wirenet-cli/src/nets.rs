use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use wirenet_netlist::binding::UnconnectedPin;
use wirenet_netlist::connectivity::NamingConflict;
use wirenet_netlist::{ConnectivityResolver, Net, NetOrigin, PinNetBinder, PinNetMap};

use crate::project::{CellRef, Project};
use crate::ui::icons;

#[derive(Args, Debug, Clone)]
#[command(about = "Show the resolved nets and pin bindings of one schematic")]
pub struct NetsArgs {
    /// Schematic, as LIB/CELL or LIB/CELL/VIEW
    #[arg(value_name = "CELL")]
    pub target: CellRef,

    /// Design root directory
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct NetsReport<'a> {
    nets: Vec<&'a Net>,
    conflicts: &'a [NamingConflict],
    instances: Vec<InstancePins<'a>>,
    unconnected: &'a [UnconnectedPin],
}

#[derive(Serialize)]
struct InstancePins<'a> {
    name: String,
    master: String,
    pins: &'a PinNetMap,
}

pub fn execute(args: NetsArgs) -> Result<()> {
    let project = Project::open(args.root.as_deref())?;
    let options = project.options();
    let key = project.top_key(&args.target, &options.switch_views)?;
    let level = project
        .library
        .schematic(&key)
        .with_context(|| format!("Failed to load {key}"))?;

    let resolution = ConnectivityResolver::resolve_level(&level, options.tolerance);
    let binding = PinNetBinder::new(&level.segments, &resolution)
        .with_tolerance(options.tolerance)
        .bind(&level.instances);

    let report = NetsReport {
        nets: resolution.nets().collect(),
        conflicts: resolution.conflicts(),
        instances: level
            .instances
            .iter()
            .zip(binding.iter())
            .map(|(instance, pins)| InstancePins {
                name: instance.name(),
                master: instance.master.to_string(),
                pins,
            })
            .collect(),
        unconnected: binding.unconnected(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", key.to_string().bold());
    for net in &report.nets {
        let origin = match net.origin {
            NetOrigin::Global => "global".cyan(),
            NetOrigin::Boundary => "boundary".blue(),
            NetOrigin::Named => "named".normal(),
            NetOrigin::Auto => "auto".dimmed(),
        };
        let flag = if net.conflicted {
            format!(" {}", icons::warning())
        } else {
            String::new()
        };
        println!(
            "  {} {} ({origin}, {} segments){flag}",
            icons::bullet(),
            net.name.bold(),
            net.segments.len()
        );
    }
    for instance in &report.instances {
        let pins = instance
            .pins
            .iter()
            .map(|(pin, net)| format!("{pin}={net}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {} {} {}", instance.name.green(), instance.master.dimmed(), pins);
    }
    for conflict in report.conflicts {
        eprintln!("{} {conflict}", icons::warning());
    }
    for unconnected in report.unconnected {
        eprintln!("{} {unconnected}", icons::warning());
    }

    Ok(())
}
