//! Net connectivity resolution and hierarchical netlist synthesis.
//!
//! This crate is the netlisting engine behind `wirenet`. It knows nothing
//! about files or canvases: a caller hands it one [`Level`] at a time (wire
//! segments, placed [`Instance`]s and boundary [`Pin`]s) through a
//! [`provider::ViewProvider`], and it produces a textual netlist.
//!
//! The pipeline for one hierarchy level is:
//!
//! * [`connectivity`] – group wire segments into named nets.
//! * [`binding`] – bind every instance pin to a net name.
//! * [`template`] – render instance lines from per-symbol templates.
//! * [`synth`] – walk the hierarchy and emit sub-circuit definitions once.

pub mod binding;
pub mod connectivity;
pub mod diagnostics;
pub mod dialect;
pub mod geometry;
pub mod provider;
pub mod synth;
pub mod template;

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use binding::{Binding, PinNetBinder, PinNetMap};
pub use connectivity::{ConnectivityResolver, Net, NetOrigin, Resolution};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use dialect::NetlistDialect;
pub use geometry::{Orientation, Point, Rect};
pub use provider::{InMemoryViewProvider, LoadError, ViewProvider};
pub use synth::{NetlistError, NetlistOptions, NetlistReport, Netlister};

pub type Symbol = String;

/// Attribute holding the instantiation line template of a symbol.
pub const ATTR_NETLIST_LINE: &str = "netlistLine";

/// Attribute holding the declared pin order (comma separated pin names).
pub const ATTR_PIN_ORDER: &str = "pinOrder";

/// Attribute holding an optional model definition template.
pub const ATTR_MODEL_LINE: &str = "modelLine";

/// Label holding the instance name.
pub const LABEL_INST_NAME: &str = "instName";

/// View used when no preferred view exists for a cell.
pub const DEFAULT_VIEW: &str = "symbol";

/// Handle of a [`NetSegment`] inside a [`Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub usize);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A straight wire between two grid points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetSegment {
    pub start: Point,
    pub end: Point,
    /// Current net name. Meaningful as an explicit name only if `name_set`.
    #[serde(default)]
    pub name: String,
    /// The name was assigned by the user.
    #[serde(default)]
    pub name_set: bool,
    /// The name was assigned by the connectivity resolver.
    #[serde(default)]
    pub name_added: bool,
    /// The segment was pulled towards two incompatible names.
    #[serde(default)]
    pub name_conflict: bool,
}

impl NetSegment {
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            name: String::new(),
            name_set: false,
            name_added: false,
            name_conflict: false,
        }
    }

    /// A segment carrying a user-assigned net name.
    pub fn named(start: impl Into<Point>, end: impl Into<Point>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_set: true,
            ..Self::new(start, end)
        }
    }

    pub fn endpoints(&self) -> [Point; 2] {
        [self.start, self.end]
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    /// The user-assigned name, if any.
    pub fn explicit_name(&self) -> Option<&str> {
        if self.name_set && !self.name.is_empty() {
            Some(&self.name)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
    #[default]
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    #[default]
    Signal,
    Ground,
    Power,
    Clock,
    Digital,
    Analog,
}

/// A named connection point at a fixed scene location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub name: Symbol,
    pub location: Point,
    #[serde(default)]
    pub direction: PinDirection,
    #[serde(default, rename = "type")]
    pub pin_type: PinType,
}

impl Pin {
    pub fn new(name: impl Into<Symbol>, location: impl Into<Point>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            direction: PinDirection::default(),
            pin_type: PinType::default(),
        }
    }

    pub fn with_direction(mut self, direction: PinDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_type(mut self, pin_type: PinType) -> Self {
        self.pin_type = pin_type;
        self
    }

    /// Global pins end in `!` and force their net name everywhere.
    pub fn is_global(&self) -> bool {
        self.name.ends_with('!')
    }

    /// Net name forced by this pin: the pin name without any trailing `!`.
    pub fn net_name(&self) -> &str {
        strip_global(&self.name)
    }
}

/// Remove the global marker from a name.
pub fn strip_global(name: &str) -> &str {
    name.strip_suffix('!').unwrap_or(name)
}

/// Identity of one representation of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewKey {
    pub library: Symbol,
    pub cell: Symbol,
    pub view: Symbol,
}

impl ViewKey {
    pub fn new(
        library: impl Into<Symbol>,
        cell: impl Into<Symbol>,
        view: impl Into<Symbol>,
    ) -> Self {
        Self {
            library: library.into(),
            cell: cell.into(),
            view: view.into(),
        }
    }

    /// The same cell with a different view.
    pub fn with_view(&self, view: impl Into<Symbol>) -> Self {
        Self {
            library: self.library.clone(),
            cell: self.cell.clone(),
            view: view.into(),
        }
    }
}

impl std::fmt::Display for ViewKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.library, self.cell, self.view)
    }
}

/// A placed copy of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Unique per-level ordinal.
    pub ordinal: usize,
    /// The library/cell/view that was placed (normally a symbol view).
    pub master: ViewKey,
    /// Pins in scene coordinates, keyed by pin name.
    #[serde(default)]
    pub pins: IndexMap<Symbol, Pin>,
    #[serde(default)]
    pub labels: IndexMap<Symbol, String>,
    #[serde(default)]
    pub attributes: IndexMap<Symbol, String>,
    /// Emit this instance as a comment only.
    #[serde(default)]
    pub ignore: bool,
    /// The caller has already expanded this instance; emit nothing.
    #[serde(default)]
    pub pass_through: bool,
}

impl Instance {
    pub fn new(ordinal: usize, master: ViewKey) -> Self {
        Self {
            ordinal,
            master,
            pins: IndexMap::new(),
            labels: IndexMap::new(),
            attributes: IndexMap::new(),
            ignore: false,
            pass_through: false,
        }
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pins.insert(pin.name.clone(), pin);
        self
    }

    pub fn with_label(mut self, key: impl Into<Symbol>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<Symbol>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn passed_through(mut self) -> Self {
        self.pass_through = true;
        self
    }

    /// The `instName` label, or `I<ordinal>` when the label is missing.
    pub fn name(&self) -> String {
        match self.labels.get(LABEL_INST_NAME) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("I{}", self.ordinal),
        }
    }

    /// Declared pin order, if the symbol has one.
    pub fn pin_order(&self) -> Option<Vec<&str>> {
        let order = self.attributes.get(ATTR_PIN_ORDER)?;
        Some(
            order
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    pub fn netlist_line(&self) -> Option<&str> {
        self.attributes.get(ATTR_NETLIST_LINE).map(String::as_str)
    }
}

/// One hierarchy level: the contents of a schematic-like container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    #[serde(default)]
    pub segments: Vec<NetSegment>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Hierarchical boundary pins.
    #[serde(default)]
    pub pins: Vec<Pin>,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: NetSegment) -> SegmentId {
        self.segments.push(segment);
        SegmentId(self.segments.len() - 1)
    }

    pub fn add_instance(&mut self, instance: Instance) -> &mut Self {
        self.instances.push(instance);
        self
    }

    pub fn add_pin(&mut self, pin: Pin) -> &mut Self {
        self.pins.push(pin);
        self
    }

    pub fn segment(&self, id: SegmentId) -> &NetSegment {
        &self.segments[id.0]
    }

    pub fn with_segment(mut self, segment: NetSegment) -> Self {
        self.add_segment(segment);
        self
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.add_instance(instance);
        self
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.add_pin(pin);
        self
    }

    /// Pins that force their name onto touching segments, in level order:
    /// instance pins first, then boundary pins.
    pub fn global_pins(&self) -> impl Iterator<Item = &Pin> {
        self.instances
            .iter()
            .flat_map(|inst| inst.pins.values())
            .chain(self.pins.iter())
            .filter(|pin| pin.is_global())
    }

    /// Boundary pins that do not carry the global marker.
    pub fn boundary_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|pin| !pin.is_global())
    }
}

/// Language of an external text view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalLanguage {
    Spice,
    VerilogA,
}

/// A cell view implemented by a text file outside the schematic database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalView {
    pub path: PathBuf,
    pub language: ExternalLanguage,
    /// Instance line template used instead of the symbol's `netlistLine`.
    #[serde(default)]
    pub netlist_line: Option<String>,
    #[serde(default)]
    pub model_line: Option<String>,
}

/// A loaded cell view, classified once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum View {
    /// A nested hierarchy level that is expanded into a sub-circuit.
    Hierarchical(Level),
    /// A device that is instantiated but never descended into.
    Leaf,
    /// A device whose definition lives in an external text file.
    External(ExternalView),
}

impl View {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, View::Hierarchical(_))
    }
}
