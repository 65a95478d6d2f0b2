//! Access to cell views of a design hierarchy.

use indexmap::IndexMap;

use crate::{View, ViewKey};

/// Source of cell views for the netlister.
///
/// Implementations own the design database (a directory tree, an editor's
/// open canvases, ...). The netlister only asks which views a cell has and
/// loads the one it picked.
pub trait ViewProvider: Send + Sync {
    /// Names of the views available for a cell.
    fn views(&self, library: &str, cell: &str) -> Result<Vec<String>, LoadError>;

    /// Load and classify one view.
    fn load(&self, key: &ViewKey) -> Result<View, LoadError>;
}

impl<P: ViewProvider + ?Sized> ViewProvider for &P {
    fn views(&self, library: &str, cell: &str) -> Result<Vec<String>, LoadError> {
        (**self).views(library, cell)
    }

    fn load(&self, key: &ViewKey) -> Result<View, LoadError> {
        (**self).load(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("cell {library}/{cell} not found")]
    CellNotFound { library: String, cell: String },

    #[error("view {0} not found")]
    ViewNotFound(ViewKey),

    #[error("cannot read {key}: {message}")]
    Unreadable { key: ViewKey, message: String },

    #[error("malformed view {key}: {message}")]
    Malformed { key: ViewKey, message: String },
}

/// Provider backed by views held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryViewProvider {
    cells: IndexMap<(String, String), IndexMap<String, View>>,
}

impl InMemoryViewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a view.
    pub fn add_view(&mut self, key: ViewKey, view: View) -> &mut Self {
        self.cells
            .entry((key.library, key.cell))
            .or_default()
            .insert(key.view, view);
        self
    }

    pub fn with_view(mut self, key: ViewKey, view: View) -> Self {
        self.add_view(key, view);
        self
    }

    pub fn remove_view(&mut self, key: &ViewKey) -> Option<View> {
        self.cells
            .get_mut(&(key.library.clone(), key.cell.clone()))?
            .shift_remove(&key.view)
    }
}

impl ViewProvider for InMemoryViewProvider {
    fn views(&self, library: &str, cell: &str) -> Result<Vec<String>, LoadError> {
        self.cells
            .get(&(library.to_owned(), cell.to_owned()))
            .map(|views| views.keys().cloned().collect())
            .ok_or_else(|| LoadError::CellNotFound {
                library: library.to_owned(),
                cell: cell.to_owned(),
            })
    }

    fn load(&self, key: &ViewKey) -> Result<View, LoadError> {
        self.cells
            .get(&(key.library.clone(), key.cell.clone()))
            .and_then(|views| views.get(&key.view))
            .cloned()
            .ok_or_else(|| LoadError::ViewNotFound(key.clone()))
    }
}
