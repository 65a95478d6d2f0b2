//! Project configuration (`wirenet.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use wirenet_netlist::{NetlistDialect, NetlistOptions};

use crate::LibraryError;

pub const CONFIG_FILE: &str = "wirenet.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub library: LibrarySection,
    pub netlist: NetlistSection,
    /// Cell to view table; its presence turns on config-override mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<IndexMap<String, String>>,
    pub dialect: NetlistDialect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySection {
    /// Design root, relative to the directory holding the configuration file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_views: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_views: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<i64>,
}

impl ProjectConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, LibraryError> {
        toml::from_str(text).map_err(|source| LibraryError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let text = fs::read_to_string(path).map_err(|e| LibraryError::io(path, e))?;
        Self::from_toml(&text, path)
    }

    /// Find and load the configuration governing `start`.
    ///
    /// Returns the directory the file was found in together with its
    /// contents, or `None` if no directory up to the filesystem root has one.
    pub fn discover(start: &Path) -> Result<Option<(PathBuf, Self)>, LibraryError> {
        let Some(dir) = find_project_root(start) else {
            return Ok(None);
        };
        let config = Self::load(&dir.join(CONFIG_FILE))?;
        debug!("using {}", dir.join(CONFIG_FILE).display());
        Ok(Some((dir, config)))
    }

    /// Design root for a project whose configuration lives in `project_dir`.
    pub fn library_root(&self, project_dir: &Path) -> PathBuf {
        match &self.library.root {
            Some(root) => project_dir.join(root),
            None => project_dir.to_path_buf(),
        }
    }

    /// Netlisting options with every unset value at its default.
    pub fn to_options(&self) -> NetlistOptions {
        let mut options = NetlistOptions::default();
        if let Some(views) = &self.netlist.switch_views {
            options.switch_views = views.clone();
        }
        if let Some(views) = &self.netlist.stop_views {
            options.stop_views = views.clone();
        }
        if let Some(tolerance) = self.netlist.tolerance {
            options.tolerance = tolerance;
        }
        options.config = self.config.clone();
        options.dialect = self.dialect.clone();
        options
    }
}

/// Walk up from `start` to the first directory containing `wirenet.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        Some(start.to_path_buf())
    } else {
        start.parent().map(Path::to_path_buf)
    };
    while let Some(dir) = current {
        if dir.join(CONFIG_FILE).is_file() {
            return Some(dir);
        }
        current = dir.parent().map(Path::to_path_buf);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ProjectConfig::from_toml("", Path::new(CONFIG_FILE)).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.to_options(), NetlistOptions::default());
    }

    #[test]
    fn sections_map_onto_options() {
        let config = ProjectConfig::from_toml(
            r#"
            [library]
            root = "designs"

            [netlist]
            switch_views = ["spice", "schematic", "symbol"]
            tolerance = 2

            [config]
            inverter = "schematic"

            [dialect]
            comment = "//"
            "#,
            Path::new(CONFIG_FILE),
        )
        .unwrap();

        let options = config.to_options();
        assert_eq!(options.switch_views, vec!["spice", "schematic", "symbol"]);
        assert_eq!(options.stop_views, vec!["symbol"]);
        assert_eq!(options.tolerance, 2);
        assert_eq!(
            options.config.as_ref().and_then(|c| c.get("inverter")).map(String::as_str),
            Some("schematic")
        );
        assert_eq!(options.dialect.comment, "//");
        assert_eq!(options.dialect.end, ".END");
        assert_eq!(
            config.library_root(Path::new("/work")),
            PathBuf::from("/work/designs")
        );
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = ProjectConfig::from_toml("[netlist]\ntolerance = \"wide\"", Path::new("x/wirenet.toml"))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration in x/wirenet.toml"));
    }

    #[test]
    fn discovery_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a").join(CONFIG_FILE), "[netlist]\ntolerance = 3\n").unwrap();

        assert_eq!(find_project_root(&nested), Some(dir.path().join("a")));
        let (root, config) = ProjectConfig::discover(&nested).unwrap().unwrap();
        assert_eq!(root, dir.path().join("a"));
        assert_eq!(config.netlist.tolerance, Some(3));
    }
}
