use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use log::debug;
use wirenet_library::{DesignLibrary, ProjectConfig};
use wirenet_netlist::{NetlistOptions, ViewKey};

/// A cell named on the command line as `LIB/CELL` or `LIB/CELL/VIEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub library: String,
    pub cell: String,
    pub view: Option<String>,
}

impl FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(format!("'{s}' has an empty component"));
        }
        match parts.as_slice() {
            [library, cell] => Ok(CellRef {
                library: library.to_string(),
                cell: cell.to_string(),
                view: None,
            }),
            [library, cell, view] => Ok(CellRef {
                library: library.to_string(),
                cell: cell.to_string(),
                view: Some(view.to_string()),
            }),
            _ => Err(format!("expected LIB/CELL or LIB/CELL/VIEW, got '{s}'")),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.library, self.cell)?;
        if let Some(view) = &self.view {
            write!(f, "/{view}")?;
        }
        Ok(())
    }
}

/// Parse `CELL=VIEW`.
pub fn parse_config_view(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((cell, view)) if !cell.is_empty() && !view.is_empty() => {
            Ok((cell.to_owned(), view.to_owned()))
        }
        _ => Err(format!("expected CELL=VIEW, got '{s}'")),
    }
}

/// The design library plus the configuration that applies to it.
pub struct Project {
    pub library: DesignLibrary,
    pub config: ProjectConfig,
}

impl Project {
    /// Locate `wirenet.toml` from the working directory and open the design
    /// root, preferring an explicit `--root`.
    pub fn open(root: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let (root, config) = match ProjectConfig::discover(&cwd)? {
            Some((dir, config)) => {
                let root = root
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| config.library_root(&dir));
                (root, config)
            }
            None => (
                root.map(Path::to_path_buf).unwrap_or(cwd),
                ProjectConfig::default(),
            ),
        };
        debug!("design root {}", root.display());
        let library = DesignLibrary::open(&root)
            .with_context(|| format!("Failed to open design root {}", root.display()))?;
        Ok(Self { library, config })
    }

    pub fn options(&self) -> NetlistOptions {
        self.config.to_options()
    }

    /// The view to start from: the one named, or the first preferred view the
    /// cell has.
    pub fn top_key(&self, cell: &CellRef, preferred: &[String]) -> Result<ViewKey> {
        if let Some(view) = &cell.view {
            return Ok(ViewKey::new(&cell.library, &cell.cell, view));
        }
        let views = self
            .library
            .view_files(&cell.library, &cell.cell)
            .with_context(|| format!("Failed to list views of {cell}"))?;
        preferred
            .iter()
            .find(|view| views.iter().any(|v| &v.name == *view))
            .map(|view| ViewKey::new(&cell.library, &cell.cell, view))
            .with_context(|| {
                format!(
                    "{cell} has none of the views {}; name one explicitly",
                    preferred.join(", ")
                )
            })
    }
}

pub fn display_path(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}
