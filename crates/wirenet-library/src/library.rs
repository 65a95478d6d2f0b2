use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use wirenet_netlist::{
    ExternalLanguage, ExternalView, Level, LoadError, View, ViewKey, ViewProvider,
};

use crate::format::{SchematicFile, SymbolFile};
use crate::LibraryError;

/// Extension of the optional model line sidecar of an external view.
pub const MODEL_EXTENSION: &str = "model";

/// Extension of the optional instance line sidecar of an external view.
pub const LINE_EXTENSION: &str = "line";

/// How a view file is interpreted, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFormat {
    Schematic,
    Symbol,
    External(ExternalLanguage),
}

impl ViewFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "sch" => Some(ViewFormat::Schematic),
            "sym" => Some(ViewFormat::Symbol),
            "sp" | "cir" | "spice" => Some(ViewFormat::External(ExternalLanguage::Spice)),
            "va" => Some(ViewFormat::External(ExternalLanguage::VerilogA)),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ViewFormat::Schematic => "schematic",
            ViewFormat::Symbol => "symbol",
            ViewFormat::External(ExternalLanguage::Spice) => "spice",
            ViewFormat::External(ExternalLanguage::VerilogA) => "veriloga",
        }
    }
}

/// A view file found in a cell directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFile {
    pub name: String,
    pub path: PathBuf,
    pub format: ViewFormat,
}

/// A directory tree of libraries, cells and views.
#[derive(Debug, Clone)]
pub struct DesignLibrary {
    root: PathBuf,
}

impl DesignLibrary {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(LibraryError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Library names, sorted.
    pub fn libraries(&self) -> Result<Vec<String>, LibraryError> {
        subdirectories(&self.root)
    }

    /// Cell names of a library, sorted.
    pub fn cells(&self, library: &str) -> Result<Vec<String>, LibraryError> {
        let dir = self.root.join(library);
        if !dir.is_dir() {
            return Err(LibraryError::LibraryNotFound(library.to_owned()));
        }
        subdirectories(&dir)
    }

    /// View files of a cell, sorted by file name.
    ///
    /// Files with an unknown extension (including `.model` and `.line`
    /// sidecars) are not views. When two files share a stem the first one
    /// wins.
    pub fn view_files(&self, library: &str, cell: &str) -> Result<Vec<ViewFile>, LibraryError> {
        let dir = self.root.join(library).join(cell);
        if !dir.is_dir() {
            return Err(LibraryError::CellNotFound {
                library: library.to_owned(),
                cell: cell.to_owned(),
            });
        }

        let mut views: Vec<ViewFile> = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            let Some(format) = ViewFormat::from_extension(ext) else {
                continue;
            };
            if views.iter().any(|v| v.name == stem) {
                warn!("{library}/{cell}: ignoring {} (duplicate view {stem})", path.display());
                continue;
            }
            views.push(ViewFile {
                name: stem.to_owned(),
                path: path.to_path_buf(),
                format,
            });
        }
        Ok(views)
    }

    pub fn view_file(&self, key: &ViewKey) -> Result<ViewFile, LibraryError> {
        self.view_files(&key.library, &key.cell)?
            .into_iter()
            .find(|v| v.name == key.view)
            .ok_or_else(|| LibraryError::ViewNotFound(key.clone()))
    }

    /// Load a view and classify it by its file format.
    pub fn load_view(&self, key: &ViewKey) -> Result<View, LibraryError> {
        let file = self.view_file(key)?;
        debug!("loading {key} from {}", file.path.display());
        match file.format {
            ViewFormat::Schematic => Ok(View::Hierarchical(self.load_level(key, &file.path)?)),
            ViewFormat::Symbol => {
                // Parse it anyway so a broken symbol is reported where it is used.
                read_json::<SymbolFile>(&file.path)?;
                Ok(View::Leaf)
            }
            ViewFormat::External(language) => Ok(View::External(ExternalView {
                netlist_line: read_sidecar(&file.path, LINE_EXTENSION)?,
                model_line: read_sidecar(&file.path, MODEL_EXTENSION)?,
                path: file.path,
                language,
            })),
        }
    }

    /// Read a symbol view.
    pub fn symbol(&self, key: &ViewKey) -> Result<SymbolFile, LibraryError> {
        let file = self.view_file(key)?;
        if file.format != ViewFormat::Symbol {
            return Err(LibraryError::ViewNotFound(key.clone()));
        }
        read_json(&file.path)
    }

    /// Read a schematic and place its instances.
    pub fn schematic(&self, key: &ViewKey) -> Result<Level, LibraryError> {
        let file = self.view_file(key)?;
        if file.format != ViewFormat::Schematic {
            return Err(LibraryError::ViewNotFound(key.clone()));
        }
        self.load_level(key, &file.path)
    }

    fn load_level(&self, key: &ViewKey, path: &Path) -> Result<Level, LibraryError> {
        let sch: SchematicFile = read_json(path)?;
        let mut level = Level::new();
        for wire in &sch.wires {
            level.add_segment(wire.to_segment());
        }
        for pin in sch.pins {
            level.add_pin(pin);
        }
        for (ordinal, record) in sch.instances.iter().enumerate() {
            let master = record.master(&key.library);
            let symbol = self.symbol(&master).map_err(|err| match err {
                LibraryError::ViewNotFound(_) => LibraryError::NotASymbol {
                    key: key.clone(),
                    instance: record.name.clone().unwrap_or_else(|| format!("I{ordinal}")),
                    master: master.clone(),
                },
                err => err,
            })?;
            level.add_instance(record.place(ordinal, master, &symbol));
        }
        Ok(level)
    }
}

impl ViewProvider for DesignLibrary {
    fn views(&self, library: &str, cell: &str) -> Result<Vec<String>, LoadError> {
        self.view_files(library, cell)
            .map(|views| views.into_iter().map(|v| v.name).collect())
            .map_err(|err| err.into_load_error(&ViewKey::new(library, cell, "")))
    }

    fn load(&self, key: &ViewKey) -> Result<View, LoadError> {
        self.load_view(key).map_err(|err| err.into_load_error(key))
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<String>, LibraryError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_owned());
            }
        }
    }
    Ok(names)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LibraryError> {
    let text = fs::read_to_string(path).map_err(|e| LibraryError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| LibraryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Trimmed contents of the `<view>.<extension>` file next to `view_path`, if
/// there is one.
fn read_sidecar(view_path: &Path, extension: &str) -> Result<Option<String>, LibraryError> {
    let sidecar = view_path.with_extension(extension);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&sidecar).map_err(|e| LibraryError::io(&sidecar, e))?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_owned()))
}
