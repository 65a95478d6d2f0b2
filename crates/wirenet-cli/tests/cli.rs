use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

fn write_demo(dir: &assert_fs::fixture::ChildPath) {
    dir.child("demo/inverter/symbol.sym")
        .write_str(
            r#"{
                "pins": [
                    {"name": "in", "location": [-10, 0], "direction": "input"},
                    {"name": "out", "location": [10, 0], "direction": "output"}
                ],
                "attributes": {"netlistLine": "X@instName @pinList @cellName"}
            }"#,
        )
        .unwrap();
    dir.child("demo/inverter/schematic.sch")
        .write_str(
            r#"{
                "wires": [
                    {"start": [0, 0], "end": [10, 0]},
                    {"start": [20, 0], "end": [30, 0]}
                ],
                "pins": [
                    {"name": "in", "location": [0, 0]},
                    {"name": "out", "location": [30, 0]}
                ],
                "instances": [{"cell": "res", "name": "R1", "origin": [10, 0]}]
            }"#,
        )
        .unwrap();
    dir.child("demo/res/symbol.sym")
        .write_str(
            r#"{
                "pins": [{"name": "a", "location": [0, 0]}, {"name": "b", "location": [10, 0]}],
                "attributes": {"netlistLine": "@instName @pinList 1k"}
            }"#,
        )
        .unwrap();
    dir.child("demo/amp/symbol.sym")
        .write_str(
            r#"{
                "pins": [{"name": "in", "location": [0, 0]}],
                "attributes": {"netlistLine": "X@instName @pinList amp"}
            }"#,
        )
        .unwrap();
    dir.child("demo/amp/spice.sp").write_str("* amp\n").unwrap();
    dir.child("demo/top/schematic.sch")
        .write_str(
            r#"{
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
            }"#,
        )
        .unwrap();
}

fn demo() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_demo(&temp.child("."));
    temp
}

fn wirenet(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wirenet").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn netlist_writes_cell_file_by_default() {
    let temp = demo();

    wirenet(&temp).args(["netlist", "demo/top"]).assert().success();

    let text = std::fs::read_to_string(temp.child("top.cir").path()).unwrap();
    assert!(text.starts_with("* wirenet netlist\n* library: demo\n* cell: top\n"));
    assert!(text.contains("XI1 a net0 inverter\n.SUBCKT inverter in out\nR1 in out 1k\n.ENDS inverter\n"));
    assert_eq!(text.matches(".SUBCKT").count(), 1);
    assert!(text.contains("XA1 a amp\n"));
    assert!(!text.contains(".INCLUDE"));
    assert!(text.ends_with(".END\n"));
}

#[test]
fn netlist_to_stdout_with_switch_views() {
    let temp = demo();

    let text = stdout_of(wirenet(&temp).args([
        "netlist",
        "demo/top/schematic",
        "-o",
        "-",
        "--switch-view",
        "spice",
        "--switch-view",
        "schematic",
    ]));

    assert!(text.contains("XI2 net0 y inverter\n"));
    assert!(text.contains(".INCLUDE "));
    assert!(text.contains("demo/amp/spice.sp\n"));
    assert!(!temp.child("top.cir").exists());
}

#[test]
fn config_file_is_discovered() {
    let temp = TempDir::new().unwrap();
    write_demo(&temp.child("designs"));
    temp.child("wirenet.toml")
        .write_str(
            r#"
            [library]
            root = "designs"

            [netlist]
            stop_views = ["schematic"]

            [dialect]
            comment = "//"
            end = ".end"
            "#,
        )
        .unwrap();
    temp.child("work").create_dir_all().unwrap();

    let mut cmd = Command::cargo_bin("wirenet").unwrap();
    cmd.current_dir(temp.child("work").path())
        .args(["netlist", "demo/top", "-o", "out/top.sp"])
        .assert()
        .success();

    let text = std::fs::read_to_string(temp.child("work/out/top.sp").path()).unwrap();
    assert!(text.starts_with("// wirenet netlist\n"));
    assert!(!text.contains(".SUBCKT"));
    assert!(text.ends_with(".end\n"));
}

#[test]
fn config_view_flag_overrides_preference() {
    let temp = demo();

    let text = stdout_of(wirenet(&temp).args([
        "netlist",
        "demo/top",
        "-o",
        "-",
        "--config-view",
        "inverter=symbol",
    ]));

    assert!(!text.contains(".SUBCKT"));
    assert!(text.contains("XI1 a net0 inverter\n"));
}

#[test]
fn failed_pass_leaves_no_output() {
    let temp = TempDir::new().unwrap();
    for (cell, child) in [("a", "b"), ("b", "a")] {
        temp.child(format!("demo/{cell}/symbol.sym"))
            .write_str(r#"{"attributes": {"netlistLine": "X@instName @cellName"}}"#)
            .unwrap();
        temp.child(format!("demo/{cell}/schematic.sch"))
            .write_str(&format!(r#"{{"instances": [{{"cell": "{child}"}}]}}"#))
            .unwrap();
    }

    let assert = wirenet(&temp)
        .args(["netlist", "demo/a", "-o", "a.cir"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("cyclic hierarchy"));

    assert!(!temp.child("a.cir").exists());
    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn nets_as_json() {
    let temp = demo();

    let text = stdout_of(wirenet(&temp).args(["nets", "demo/top", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    let nets: Vec<&str> = json["nets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(nets, vec!["a", "y", "net0"]);
    assert_eq!(json["instances"][1]["name"], "I2");
    assert_eq!(json["instances"][1]["pins"]["in"], "net0");
    assert_eq!(json["instances"][1]["pins"]["out"], "y");
    assert_eq!(json["conflicts"].as_array().unwrap().len(), 0);
}

#[test]
fn list_shows_cells_and_views() {
    let temp = demo();

    let text = stdout_of(wirenet(&temp).args(["list"]));

    assert!(text.contains("demo"));
    for cell in ["amp", "inverter", "res", "top"] {
        assert!(text.contains(cell), "missing {cell} in {text}");
    }
    assert!(text.contains("schematic"));
    assert!(text.contains("spice"));
}

#[test]
fn rejects_malformed_targets() {
    let temp = demo();
    wirenet(&temp)
        .args(["netlist", "demo"])
        .assert()
        .failure();
    wirenet(&temp)
        .args(["netlist", "demo/missing"])
        .assert()
        .failure();
}
