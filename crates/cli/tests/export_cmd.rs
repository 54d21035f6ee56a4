use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::tempdir;

fn table_bytes() -> Vec<u8> {
    [10u16, 20, 11, 21, 12, 22].iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// scan then export-xdf: the XDF document reflects the persisted session.
#[test]
fn export_renders_scanned_session() {
    let dir = tempdir().expect("tempdir");
    let image_path = dir.path().join("ms42.bin");
    let maps_path = dir.path().join("maps.json");
    let xdf_path = dir.path().join("out.xdf");
    fs::write(&image_path, table_bytes()).expect("write image");

    cargo_bin_cmd!("rommap")
        .arg("scan")
        .arg(&image_path)
        .arg("--out")
        .arg(&maps_path)
        .assert()
        .success();

    cargo_bin_cmd!("rommap")
        .arg("export-xdf")
        .arg(&maps_path)
        .arg("--out")
        .arg(&xdf_path)
        .assert()
        .success();

    let document = fs::read_to_string(&xdf_path).expect("xdf written");
    assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(document.contains("<Tool>rommap v"));
    assert!(document.contains(
        "<Map name=\"AutoDetect\" offset=\"0x0\" rows=\"3\" cols=\"2\" elementSize=\"2\">"
    ));
    assert!(document.contains("<Row><V>10</V><V>20</V></Row>"));
}

/// A missing session file is an input-read failure (exit 2).
#[test]
fn export_missing_maps_exits_2() {
    let dir = tempdir().expect("tempdir");
    cargo_bin_cmd!("rommap")
        .arg("export-xdf")
        .arg(dir.path().join("absent.json"))
        .arg("--out")
        .arg(dir.path().join("out.xdf"))
        .assert()
        .failure()
        .code(2);
}

/// A malformed session file is a decode failure (exit 3).
#[test]
fn export_malformed_maps_exits_3() {
    let dir = tempdir().expect("tempdir");
    let maps_path = dir.path().join("maps.json");
    fs::write(&maps_path, "[{]").expect("write");

    cargo_bin_cmd!("rommap")
        .arg("export-xdf")
        .arg(&maps_path)
        .arg("--out")
        .arg(dir.path().join("out.xdf"))
        .assert()
        .failure()
        .code(3);
}

/// An unwritable output path is a write failure (exit 4).
#[test]
fn export_unwritable_out_exits_4() {
    let dir = tempdir().expect("tempdir");
    let maps_path = dir.path().join("maps.json");
    fs::write(&maps_path, "[]").expect("write");

    cargo_bin_cmd!("rommap")
        .arg("export-xdf")
        .arg(&maps_path)
        .arg("--out")
        .arg(dir.path().join("no_such_dir").join("out.xdf"))
        .assert()
        .failure()
        .code(4);
}
