use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Command isolated from the user's config and log filter.
fn vaultpack(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vaultpack"));
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn read_entry(archive: &Path, name: &str) -> String {
    let file = fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

fn sample_vault(root: &Path) {
    write_file(root, "Welcome.md", "Start at [[Plan]].\n");
    write_file(root, "Work Items/Plan.md", "# Plan\n\n#todo [[Nowhere]]\n");
}

#[test]
fn exports_vault_to_zip() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let vault = work.path().join("vault");
    let out = work.path().join("out.zip");
    sample_vault(&vault);

    vaultpack(&home)
        .arg(&vault)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported to"))
        .stdout(predicate::str::contains("Documents"))
        .stdout(predicate::str::contains("Nowhere"));

    let welcome = read_entry(&out, "Welcome.md");
    assert_eq!(welcome, "---\ntype: Page\n---\nStart at [Plan](Work_Items/Plan.md).\n");

    let plan = read_entry(&out, "Work_Items/Plan.md");
    assert!(plan.contains("type: SetLeaf"), "{plan}");
    assert!(plan.contains("set: Work Items"), "{plan}");
    assert!(plan.contains("todo: todo"), "{plan}");

    let index = read_entry(&out, "Index.md");
    assert!(index.contains("## Work Items\n\n- [Plan](Work_Items/Plan.md)"), "{index}");
}

#[test]
fn json_summary_reports_counts() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let vault = work.path().join("vault");
    let out = work.path().join("out.zip");
    sample_vault(&vault);

    let output = vaultpack(&home).arg(&vault).arg(&out).arg("--json").output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["documents"], 2);
    assert_eq!(summary["containers"], 1);
    assert_eq!(summary["index_path"], "Index.md");
    assert_eq!(summary["unresolved"][0]["reference"], "Nowhere");
    assert_eq!(summary["archive"], out.display().to_string());
}

#[test]
fn archive_inside_vault_is_not_packed() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let vault = work.path().join("vault");
    sample_vault(&vault);
    let out = vault.join("export.zip");

    vaultpack(&home).arg(&vault).arg(&out).arg("--json").assert().success();

    let zip = zip::ZipArchive::new(fs::File::open(&out).unwrap()).unwrap();
    let names: Vec<&str> = zip.file_names().collect();
    assert!(!names.contains(&"export.zip"), "{names:?}");
    assert!(names.contains(&"Welcome.md"));
}

#[test]
fn missing_vault_fails_without_archive() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let out = work.path().join("out.zip");

    vaultpack(&home)
        .arg(work.path().join("no-such-vault"))
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));

    assert!(!out.exists());
}

#[test]
fn file_as_vault_fails() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let file = work.path().join("note.md");
    fs::write(&file, "x").unwrap();
    let out = work.path().join("out.zip");

    vaultpack(&home)
        .arg(&file)
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));

    assert!(!out.exists());
}

#[test]
fn missing_config_file_fails() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let vault = work.path().join("vault");
    sample_vault(&vault);

    vaultpack(&home)
        .arg(&vault)
        .arg(work.path().join("out.zip"))
        .arg("--config")
        .arg(work.path().join("missing.toml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn config_changes_index() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let vault = work.path().join("vault");
    let out = work.path().join("out.zip");
    sample_vault(&vault);
    let cfg = work.path().join("config.toml");
    fs::write(&cfg, "[export]\nindex_name = \"Start Here.md\"\nindex_title = \"Home\"\n").unwrap();

    vaultpack(&home).arg(&vault).arg(&out).arg("--config").arg(&cfg).assert().success();

    let index = read_entry(&out, "Start_Here.md");
    assert!(index.starts_with("---\ntype: Page\n---\n# Home\n"), "{index}");
}

#[test]
fn verbose_and_quiet_conflict() {
    let home = tempdir().unwrap();
    vaultpack(&home).args(["-v", "-q"]).assert().failure();
}
