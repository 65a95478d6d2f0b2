use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::NaiveDate;
use wirenet_library::{DesignLibrary, LibraryError};
use wirenet_netlist::{
    LoadError, NetlistOptions, Netlister, Point, View, ViewKey, ViewProvider, LABEL_INST_NAME,
};

const INVERTER_SYMBOL: &str = r#"{
    "pins": [
        {"name": "in", "location": [-10, 0], "direction": "input"},
        {"name": "out", "location": [10, 0], "direction": "output"}
    ],
    "attributes": {"netlistLine": "X@instName @pinList @cellName"}
}"#;

const INVERTER_SCHEMATIC: &str = r#"{
    "wires": [
        {"start": [0, 0], "end": [10, 0]},
        {"start": [20, 0], "end": [30, 0]}
    ],
    "pins": [
        {"name": "in", "location": [0, 0], "direction": "input"},
        {"name": "out", "location": [30, 0], "direction": "output"}
    ],
    "instances": [
        {"cell": "res", "name": "R1", "origin": [10, 0]}
    ]
}"#;

const RES_SYMBOL: &str = r#"{
    "pins": [
        {"name": "a", "location": [0, 0]},
        {"name": "b", "location": [10, 0]}
    ],
    "attributes": {"netlistLine": "@instName @pinList 1k"}
}"#;

const AMP_SYMBOL: &str = r#"{
    "pins": [{"name": "in", "location": [0, 0]}],
    "attributes": {"netlistLine": "X@instName @pinList amp"}
}"#;

const TOP_SCHEMATIC: &str = r#"{
    "wires": [
        {"start": [-10, 0], "end": [0, 0], "name": "a"},
        {"start": [20, 0], "end": [40, 0]},
        {"start": [60, 0], "end": [70, 0], "name": "y"}
    ],
    "instances": [
        {"cell": "inverter", "name": "I1", "origin": [10, 0]},
        {"cell": "inverter", "name": "I2", "origin": [50, 0]},
        {"cell": "amp", "name": "A1", "origin": [-10, 0]}
    ]
}"#;

fn demo_library() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("demo/inverter/symbol.sym")
        .write_str(INVERTER_SYMBOL)
        .unwrap();
    temp.child("demo/inverter/schematic.sch")
        .write_str(INVERTER_SCHEMATIC)
        .unwrap();
    temp.child("demo/res/symbol.sym").write_str(RES_SYMBOL).unwrap();
    temp.child("demo/amp/symbol.sym").write_str(AMP_SYMBOL).unwrap();
    temp.child("demo/amp/spice.sp")
        .write_str(".SUBCKT amp in\n.ENDS amp\n")
        .unwrap();
    temp.child("demo/amp/spice.model")
        .write_str(".MODEL amp D\n")
        .unwrap();
    temp.child("demo/top/schematic.sch")
        .write_str(TOP_SCHEMATIC)
        .unwrap();
    temp
}

#[test]
fn lists_libraries_cells_and_views() {
    let temp = demo_library();
    let lib = DesignLibrary::open(temp.path()).unwrap();

    assert_eq!(lib.libraries().unwrap(), vec!["demo"]);
    assert_eq!(lib.cells("demo").unwrap(), vec!["amp", "inverter", "res", "top"]);
    assert_eq!(lib.views("demo", "amp").unwrap(), vec!["spice", "symbol"]);
    assert_eq!(lib.views("demo", "inverter").unwrap(), vec!["schematic", "symbol"]);
    assert!(matches!(
        lib.cells("analog"),
        Err(LibraryError::LibraryNotFound(_))
    ));
}

#[test]
fn schematic_instances_are_placed_from_symbols() {
    let temp = demo_library();
    let lib = DesignLibrary::open(temp.path()).unwrap();

    let level = lib
        .schematic(&ViewKey::new("demo", "top", "schematic"))
        .unwrap();
    assert_eq!(level.segments.len(), 3);
    assert_eq!(level.segments[0].explicit_name(), Some("a"));
    assert_eq!(level.instances.len(), 3);

    let i2 = &level.instances[1];
    assert_eq!(i2.ordinal, 1);
    assert_eq!(i2.master, ViewKey::new("demo", "inverter", "symbol"));
    assert_eq!(i2.labels[LABEL_INST_NAME], "I2");
    assert_eq!(i2.pins["in"].location, Point::new(40, 0));
    assert_eq!(i2.pins["out"].location, Point::new(60, 0));
}

#[test]
fn views_are_classified_by_extension() {
    let temp = demo_library();
    let lib = DesignLibrary::open(temp.path()).unwrap();

    assert!(lib
        .load(&ViewKey::new("demo", "inverter", "schematic"))
        .unwrap()
        .is_hierarchical());
    assert_eq!(
        lib.load(&ViewKey::new("demo", "res", "symbol")).unwrap(),
        View::Leaf
    );
    match lib.load(&ViewKey::new("demo", "amp", "spice")).unwrap() {
        View::External(ext) => {
            assert!(ext.path.ends_with("demo/amp/spice.sp"));
            assert_eq!(ext.model_line.as_deref(), Some(".MODEL amp D"));
        }
        other => panic!("expected an external view, got {other:?}"),
    }
}

#[test]
fn netlists_a_library_on_disk() {
    let temp = demo_library();
    let lib = DesignLibrary::open(temp.path()).unwrap();
    let timestamp = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    let options = NetlistOptions::default()
        .with_switch_views(["spice", "schematic", "symbol"])
        .with_timestamp(timestamp);

    let (text, report) = Netlister::new(&lib, options)
        .render(&ViewKey::new("demo", "top", "schematic"))
        .unwrap();
    let text = text.replace(&temp.path().display().to_string(), "[ROOT]");

    insta::assert_snapshot!(text, @r"
    * wirenet netlist
    * library: demo
    * cell: top
    * view: schematic
    * date: 2024-05-01 12:00:00
    *
    XI1 a net0 inverter
    .SUBCKT inverter in out
    R1 in out 1k
    .ENDS inverter
    XI2 net0 y inverter
    XA1 a amp
    .INCLUDE [ROOT]/demo/amp/spice.sp
    .MODEL amp D
    .END
    ");
    assert!(report.diagnostics.is_empty());
}

#[test]
fn external_view_line_sidecar_is_used_for_the_instance() {
    let temp = TempDir::new().unwrap();
    temp.child("demo/osc/symbol.sym")
        .write_str(
            r#"{
                "pins": [{"name": "out", "location": [0, 0]}],
                "attributes": {"netlistLine": "X@instName @pinList osc"}
            }"#,
        )
        .unwrap();
    temp.child("demo/osc/veriloga.va")
        .write_str("module osc(out); endmodule\n")
        .unwrap();
    temp.child("demo/osc/veriloga.line")
        .write_str("N@instName @pinList osc_va\n")
        .unwrap();
    temp.child("demo/top/schematic.sch")
        .write_str(
            r#"{
                "wires": [{"start": [0, 0], "end": [0, 10], "name": "clk"}],
                "instances": [{"cell": "osc", "name": "O1"}]
            }"#,
        )
        .unwrap();
    let lib = DesignLibrary::open(temp.path()).unwrap();

    assert_eq!(lib.views("demo", "osc").unwrap(), vec!["symbol", "veriloga"]);
    match lib.load(&ViewKey::new("demo", "osc", "veriloga")).unwrap() {
        View::External(ext) => {
            assert_eq!(ext.netlist_line.as_deref(), Some("N@instName @pinList osc_va"));
            assert_eq!(ext.model_line, None);
        }
        other => panic!("expected an external view, got {other:?}"),
    }

    let options = NetlistOptions::default().with_switch_views(["veriloga", "symbol"]);
    let (text, report) = Netlister::new(&lib, options)
        .render(&ViewKey::new("demo", "top", "schematic"))
        .unwrap();
    assert!(text.contains("NO1 clk osc_va\n"));
    assert!(!text.contains("XO1"));
    assert!(text.contains(".HDL "));
    assert!(report.diagnostics.is_empty());
}

#[test]
fn broken_files_surface_as_load_errors() {
    let temp = demo_library();
    temp.child("demo/bad/schematic.sch")
        .write_str("{ not json")
        .unwrap();
    temp.child("demo/orphan/schematic.sch")
        .write_str(r#"{"instances": [{"cell": "missing", "name": "U1"}]}"#)
        .unwrap();
    let lib = DesignLibrary::open(temp.path()).unwrap();

    let key = ViewKey::new("demo", "bad", "schematic");
    match lib.load(&key) {
        Err(LoadError::Malformed { key: k, message }) => {
            assert_eq!(k, key);
            assert!(message.starts_with("invalid JSON in"));
        }
        other => panic!("expected a malformed view, got {other:?}"),
    }

    assert!(matches!(
        lib.load(&ViewKey::new("demo", "orphan", "schematic")),
        Err(LoadError::CellNotFound { cell, .. }) if cell == "missing"
    ));
    assert_eq!(
        lib.load(&ViewKey::new("demo", "top", "layout")),
        Err(LoadError::ViewNotFound(ViewKey::new("demo", "top", "layout")))
    );
}
