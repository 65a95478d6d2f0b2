use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::project::Project;
use crate::ui::icons;

#[derive(Args, Debug, Clone)]
#[command(about = "List libraries, cells and views")]
pub struct ListArgs {
    /// Design root directory
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Only list this library
    #[arg(value_name = "LIB")]
    pub library: Option<String>,
}

pub fn execute(args: ListArgs) -> Result<()> {
    let project = Project::open(args.root.as_deref())?;
    let library = &project.library;

    let libraries = match args.library {
        Some(name) => vec![name],
        None => library.libraries()?,
    };
    if libraries.is_empty() {
        eprintln!(
            "{} No libraries in {}",
            icons::warning(),
            library.root().display()
        );
        return Ok(());
    }

    for lib in &libraries {
        println!("{}", lib.bold());
        for cell in library.cells(lib)? {
            let views = library
                .view_files(lib, &cell)?
                .into_iter()
                .map(|v| format!("{} {}", v.name, format!("({})", v.format.describe()).dimmed()))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {} {}: {}", icons::bullet(), cell.green(), views);
        }
    }

    Ok(())
}
