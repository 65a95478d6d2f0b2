//! JSON layout of schematic (`.sch`) and symbol (`.sym`) files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use wirenet_netlist::{
    Instance, NetSegment, Orientation, Pin, Point, ViewKey, DEFAULT_VIEW, LABEL_INST_NAME,
};

/// A schematic: wires, boundary pins and placed symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchematicFile {
    pub wires: Vec<WireRecord>,
    pub pins: Vec<Pin>,
    pub instances: Vec<InstanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    pub start: Point,
    pub end: Point,
    /// User-assigned net name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireRecord {
    pub fn to_segment(&self) -> NetSegment {
        match &self.name {
            Some(name) if !name.is_empty() => NetSegment::named(self.start, self.end, name.clone()),
            _ => NetSegment::new(self.start, self.end),
        }
    }
}

fn default_view() -> String {
    DEFAULT_VIEW.to_owned()
}

/// A symbol placed on a schematic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Library of the placed symbol; defaults to the schematic's own library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    pub cell: String,
    #[serde(default = "default_view")]
    pub view: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub origin: Point,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub pass_through: bool,
}

impl InstanceRecord {
    pub fn master(&self, default_library: &str) -> ViewKey {
        ViewKey::new(
            self.library.as_deref().unwrap_or(default_library),
            self.cell.clone(),
            self.view.clone(),
        )
    }

    /// Build the placed instance from its symbol.
    ///
    /// Symbol pins are oriented and moved to the instance origin. Labels and
    /// attributes start from the symbol's and are overridden by the record's.
    pub fn place(&self, ordinal: usize, master: ViewKey, symbol: &SymbolFile) -> Instance {
        let mut instance = Instance::new(ordinal, master);
        for pin in &symbol.pins {
            let mut placed = pin.clone();
            placed.location = self.orientation.place(pin.location, self.origin);
            instance = instance.with_pin(placed);
        }
        instance.labels = symbol.labels.clone();
        instance.labels.extend(self.labels.clone());
        if let Some(name) = &self.name {
            instance.labels.insert(LABEL_INST_NAME.to_owned(), name.clone());
        }
        instance.attributes = symbol.attributes.clone();
        instance.attributes.extend(self.attributes.clone());
        instance.ignore = self.ignore;
        instance.pass_through = self.pass_through;
        instance
    }
}

/// A symbol: pins in symbol-local coordinates plus default labels and attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolFile {
    pub pins: Vec<Pin>,
    pub labels: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirenet_netlist::{PinDirection, ATTR_NETLIST_LINE};

    #[test]
    fn schematic_defaults() {
        let sch: SchematicFile = serde_json::from_str(
            r#"{
                "wires": [{"start": [0, 0], "end": [10, 0]}, {"start": [10, 0], "end": [10, 5], "name": "clk"}],
                "instances": [{"cell": "inv", "name": "I1"}]
            }"#,
        )
        .unwrap();

        assert!(sch.pins.is_empty());
        assert_eq!(sch.wires[0].to_segment().explicit_name(), None);
        assert_eq!(sch.wires[1].to_segment().explicit_name(), Some("clk"));

        let inst = &sch.instances[0];
        assert_eq!(inst.view, "symbol");
        assert_eq!(inst.orientation, Orientation::R0);
        assert_eq!(inst.master("analog"), ViewKey::new("analog", "inv", "symbol"));
    }

    #[test]
    fn placing_orients_then_moves_pins() {
        let symbol: SymbolFile = serde_json::from_str(
            r#"{
                "pins": [
                    {"name": "in", "location": [-10, 0], "direction": "input"},
                    {"name": "out", "location": [10, 0], "direction": "output"}
                ],
                "labels": {"instName": "X", "model": "inv1x"},
                "attributes": {"netlistLine": "X@instName @pinList @model"}
            }"#,
        )
        .unwrap();
        let record: InstanceRecord = serde_json::from_str(
            r#"{"cell": "inv", "name": "U7", "origin": [100, 50], "orientation": "R90",
                "labels": {"model": "inv4x"}}"#,
        )
        .unwrap();

        let inst = record.place(3, record.master("lib"), &symbol);
        assert_eq!(inst.ordinal, 3);
        assert_eq!(inst.pins["in"].location, Point::new(100, 60));
        assert_eq!(inst.pins["out"].location, Point::new(100, 40));
        assert_eq!(inst.pins["in"].direction, PinDirection::Input);
        assert_eq!(inst.name(), "U7");
        assert_eq!(inst.labels["model"], "inv4x");
        assert_eq!(inst.netlist_line(), Some("X@instName @pinList @model"));
        assert!(inst.attributes.contains_key(ATTR_NETLIST_LINE));
    }
}
