//! Textual conventions of the target simulator and out-of-band directives.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::template::{Substitution, Template};

/// Literal syntax used around instance lines.
///
/// The engine never interprets these strings beyond placeholder substitution,
/// so any SPICE-like dialect can be targeted by overriding them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistDialect {
    /// Comment marker at the start of a line.
    pub comment: String,
    /// Sub-circuit header; sees `@cellName`, `@libName`, `@viewName` and `@pinList`.
    pub subckt_header: String,
    pub subckt_footer: String,
    /// Include directive for external netlist files; sees `@path`.
    pub include: String,
    /// Declaration of an external behavioural module; sees `@path`.
    pub external_module: String,
    pub end: String,
}

impl Default for NetlistDialect {
    fn default() -> Self {
        Self {
            comment: "*".to_owned(),
            subckt_header: ".SUBCKT @cellName @pinList".to_owned(),
            subckt_footer: ".ENDS @cellName".to_owned(),
            include: ".INCLUDE @path".to_owned(),
            external_module: ".HDL @path".to_owned(),
            end: ".END".to_owned(),
        }
    }
}

impl NetlistDialect {
    pub fn comment_line(&self, text: impl AsRef<str>) -> String {
        let text = text.as_ref();
        if text.is_empty() {
            self.comment.clone()
        } else {
            format!("{} {}", self.comment, text)
        }
    }

    pub fn include_line(&self, path: &str) -> String {
        Template::parse(&self.include).render(&Substitution::new().property("path", path))
    }

    pub fn external_module_line(&self, path: &str) -> String {
        Template::parse(&self.external_module).render(&Substitution::new().property("path", path))
    }
}

/// Directives collected while walking the hierarchy and written after it.
///
/// Each kind is deduplicated by exact text and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    includes: IndexSet<String>,
    models: IndexSet<String>,
    externals: IndexSet<String>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the line was already present.
    pub fn add_include(&mut self, line: impl Into<String>) -> bool {
        self.includes.insert(line.into())
    }

    pub fn add_model(&mut self, line: impl Into<String>) -> bool {
        self.models.insert(line.into())
    }

    pub fn add_external(&mut self, line: impl Into<String>) -> bool {
        self.externals.insert(line.into())
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.models.is_empty() && self.externals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.includes.len() + self.models.len() + self.externals.len()
    }

    /// Includes, then models, then external modules.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.includes
            .iter()
            .chain(&self.models)
            .chain(&self.externals)
            .map(String::as_str)
    }
}
