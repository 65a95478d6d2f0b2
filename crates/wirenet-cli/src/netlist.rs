use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use log::debug;
use tempfile::NamedTempFile;
use wirenet_library::DesignLibrary;
use wirenet_netlist::{NetlistOptions, NetlistReport, Netlister, ViewKey};

use crate::project::{display_path, parse_config_view, CellRef, Project};
use crate::ui::{self, Spinner};

/// Extension of the netlist written when no output is given.
const DEFAULT_EXTENSION: &str = "cir";

#[derive(Args, Debug, Clone)]
#[command(about = "Write the netlist of a cell hierarchy")]
pub struct NetlistArgs {
    /// Top cell, as LIB/CELL or LIB/CELL/VIEW
    #[arg(value_name = "CELL")]
    pub target: CellRef,

    /// Output file, or `-` for stdout. Defaults to `<cell>.cir`
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Design root directory
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Preferred view, best first (repeatable; replaces the configured list)
    #[arg(long = "switch-view", value_name = "VIEW")]
    pub switch_views: Vec<String>,

    /// View that is never descended into (repeatable; replaces the configured list)
    #[arg(long = "stop-view", value_name = "VIEW")]
    pub stop_views: Vec<String>,

    /// Netlist CELL through VIEW regardless of preference (repeatable)
    #[arg(long = "config-view", value_name = "CELL=VIEW", value_parser = parse_config_view)]
    pub config_views: Vec<(String, String)>,

    /// Connection tolerance in grid units
    #[arg(long, value_name = "UNITS")]
    pub tolerance: Option<i64>,
}

impl NetlistArgs {
    /// Command line values on top of the project configuration.
    fn apply(&self, mut options: NetlistOptions) -> NetlistOptions {
        if !self.switch_views.is_empty() {
            options.switch_views = self.switch_views.clone();
        }
        if !self.stop_views.is_empty() {
            options.stop_views = self.stop_views.clone();
        }
        for (cell, view) in &self.config_views {
            options = options.with_config_view(cell, view);
        }
        if let Some(tolerance) = self.tolerance {
            options.tolerance = tolerance;
        }
        options
    }
}

#[derive(Debug, Clone)]
enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    fn new(output: Option<&Path>, cell: &str) -> Self {
        match output {
            Some(path) if path == Path::new("-") => Destination::Stdout,
            Some(path) => Destination::File(path.to_path_buf()),
            None => Destination::File(PathBuf::from(format!("{cell}.{DEFAULT_EXTENSION}"))),
        }
    }
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    let project = Project::open(args.root.as_deref())?;
    let options = args.apply(project.options());
    let top = project.top_key(&args.target, &options.switch_views)?;
    let destination = Destination::new(args.output.as_deref(), &args.target.cell);
    debug!("netlisting {top} to {destination:?}");

    let message = format!("{top}: Netlisting");
    let spinner = match destination {
        Destination::Stdout => Spinner::hidden(message),
        Destination::File(_) => Spinner::start(message),
    };

    // The pass runs on its own worker so the spinner keeps ticking.
    let library = project.library.clone();
    let worker = {
        let top = top.clone();
        let destination = destination.clone();
        thread::Builder::new()
            .name("netlist".to_owned())
            .spawn(move || write_netlist(library, options, &top, &destination))?
    };
    let result = worker
        .join()
        .map_err(|_| anyhow!("netlist worker panicked"))?;

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            spinner.error(format!("{top}: Netlisting failed"));
            return Err(err);
        }
    };

    spinner.suspend(|| ui::render_diagnostics(&report.diagnostics));

    let summary = format!(
        "{} ({} instances, {} sub-circuits)",
        match &destination {
            Destination::Stdout => "stdout".to_owned(),
            Destination::File(path) => display_path(path).display().to_string(),
        },
        report.instances,
        report.subcircuits.len()
    );
    let errors = report.errors().count();
    if errors > 0 {
        spinner.warning(format!(
            "{}: {} with {errors} error(s)",
            top.to_string().yellow().bold(),
            summary
        ));
    } else {
        spinner.success(format!("{}: {}", top.to_string().green().bold(), summary));
    }

    Ok(())
}

/// Run one pass. File output goes through a temporary file next to the
/// destination and only replaces it once the pass succeeded.
fn write_netlist(
    library: DesignLibrary,
    options: NetlistOptions,
    top: &ViewKey,
    destination: &Destination,
) -> Result<NetlistReport> {
    let netlister = Netlister::new(library, options);
    match destination {
        Destination::Stdout => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            Ok(netlister.write(top, &mut out)?)
        }
        Destination::File(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let mut tmp = NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;

            let report = {
                let mut out = BufWriter::new(tmp.as_file_mut());
                let report = netlister.write(top, &mut out)?;
                out.flush()?;
                report
            };

            tmp.persist(path)
                .map_err(|e| e.error)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: NetlistArgs,
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::parse_from([
            "wirenet",
            "demo/top",
            "--switch-view",
            "spice",
            "--switch-view",
            "schematic",
            "--config-view",
            "inverter=symbol",
            "--tolerance",
            "3",
        ]);
        let options = cli.args.apply(
            NetlistOptions::default().with_stop_views(["symbol", "spice"]),
        );

        assert_eq!(options.switch_views, vec!["spice", "schematic"]);
        assert_eq!(options.stop_views, vec!["symbol", "spice"]);
        assert_eq!(options.tolerance, 3);
        assert_eq!(
            options.config.and_then(|c| c.get("inverter").cloned()),
            Some("symbol".to_owned())
        );
    }

    #[test]
    fn destination_defaults_to_cell_name() {
        assert!(matches!(
            Destination::new(None, "top"),
            Destination::File(p) if p == Path::new("top.cir")
        ));
        assert!(matches!(
            Destination::new(Some(Path::new("-")), "top"),
            Destination::Stdout
        ));
    }
}
