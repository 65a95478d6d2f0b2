//! Design libraries stored on disk.
//!
//! A design root holds one directory per library and one directory per cell
//! inside it. Every file in a cell directory is a view of that cell, named
//! after the file stem; the extension decides what kind of view it is:
//!
//! ```text
//! root/
//!   analog/
//!     inverter/
//!       schematic.sch    JSON schematic, hierarchical
//!       symbol.sym       JSON symbol, leaf
//!     opamp/
//!       spice.sp         external SPICE text
//!       spice.model      optional model line for the view above
//!       spice.line       optional instance line, used instead of the symbol's
//! ```

pub mod config;
pub mod format;
pub mod library;

use std::path::PathBuf;

use wirenet_netlist::{LoadError, ViewKey};

pub use config::{find_project_root, ProjectConfig, CONFIG_FILE};
pub use library::{DesignLibrary, ViewFile, ViewFormat};

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("library {0} not found")]
    LibraryNotFound(String),

    #[error("cell {library}/{cell} not found")]
    CellNotFound { library: String, cell: String },

    #[error("view {0} not found")]
    ViewNotFound(ViewKey),

    #[error("{instance} in {key} places {master}, which is not a symbol")]
    NotASymbol {
        key: ViewKey,
        instance: String,
        master: ViewKey,
    },
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LibraryError::Io {
            path: path.into(),
            source,
        }
    }

    /// Translate into the error reported to the netlister for `key`.
    pub fn into_load_error(self, key: &ViewKey) -> LoadError {
        match self {
            LibraryError::LibraryNotFound(library) => LoadError::CellNotFound {
                library,
                cell: key.cell.clone(),
            },
            LibraryError::CellNotFound { library, cell } => LoadError::CellNotFound { library, cell },
            LibraryError::ViewNotFound(key) => LoadError::ViewNotFound(key),
            err @ (LibraryError::Io { .. } | LibraryError::Walk(_)) => LoadError::Unreadable {
                key: key.clone(),
                message: err.to_string(),
            },
            err => LoadError::Malformed {
                key: key.clone(),
                message: err.to_string(),
            },
        }
    }
}
