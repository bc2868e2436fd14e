use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("blt_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const HEADER: &str = "\
collection:
  id: {id}
  author: Johannes Reinhardt <jreinhardt@ist-dein-freund.de>
  license: LGPL 2.1+ <http://www.gnu.org/licenses/old-licenses/lgpl-2.1>
  blt-version: 0.2
";

const HEX_CLASSES: &str = "\
classes:
  - id: hexscrew1
    naming:
      template: Hex screw %s x %g
      substitute: [key, l]
    standard: [DIN931, ISO4014]
    status: withdrawn
    source: Invented for testpurposes
    parameters:
      free: [key, l]
      defaults: {key: M3, l: 20}
      types: {key: Table Index, l: Length (mm)}
      tables:
        index: key
        columns: [d1, k, s]
        data:
          M3: [3, 2, 5.5]
          M4: [4, 2.8, 7]
  - id: hexscrew2
    naming: {template: Hex screw %s x %g, substitute: [key, l]}
    standard: DINENISO4014
    replaces: DIN931
    source: Invented for testpurposes
    parameters:
      free: [key, l]
      types: {key: Table Index}
      tables:
        index: key
        columns: [d1, k, s]
        data:
          M3: [3, 2, 5.5]
";

const WASHER_CLASSES: &str = "\
classes:
  - id: washer1
    naming: {template: Washer %s, substitute: [key]}
    source: Invented for testpurposes
    parameters:
      free: [key, chamfered]
      defaults: {key: M3}
      types: {key: Table Index, chamfered: Bool}
      tables:
        index: key
        columns: [d1, d2]
        data:
          M4: [4.3, 9]
          M3: [3.2, 7]
";

const HEX_BASE: &str = "\
- filename: hex.scad
  author: Johannes Reinhardt <jreinhardt@ist-dein-freund.de>
  license: LGPL 2.1+ <http://www.gnu.org/licenses/old-licenses/lgpl-2.1>
  type: module
  modules:
    - name: hex_screw
      arguments: [d1, k, s, l, thread]
      classids: [hexscrew1]
      parameters:
        literal: {thread: metric}
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).expect("failed to create directory");
    fs::write(path, content).expect("failed to write file");
}

/// Writes a two-collection repository with one OpenSCAD base.
fn sample_repo(name: &str) -> TempDir {
    let dir = TempDir::new(name);
    write(dir.path(), "data/hex.blt", &(HEADER.replace("{id}", "hex") + HEX_CLASSES));
    write(dir.path(), "data/washer.blt", &(HEADER.replace("{id}", "washer") + WASHER_CLASSES));
    write(dir.path(), "openscad/hex/hex.base", HEX_BASE);
    dir
}

fn blt(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blt"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run blt")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn repo_arg(dir: &TempDir) -> String {
    dir.path().display().to_string()
}

// ---------------------------------------------------------------------------
// check / classes
// ---------------------------------------------------------------------------

#[test]
fn check_reports_counts() {
    let dir = sample_repo("check_counts");
    let output = blt(&["check", &repo_arg(&dir)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Loaded 2 collection(s) with 4 class(es)."));
    assert!(out.contains("  DIN: 1"));
    assert!(out.contains("  ISO: 1"));
    assert!(out.contains("  DINENISO: 1"));
    assert!(out.contains("  OpenSCAD bases: 1"));
}

#[test]
fn check_fails_on_missing_repository() {
    let dir = TempDir::new("check_missing");
    let output = blt(&["check", &dir.join("nothing").display().to_string()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: malformed repository"));
}

#[test]
fn check_reports_collection_trace() {
    let dir = sample_repo("check_trace");
    write(dir.path(), "data/bad.blt", &(HEADER.replace("{id}", "wrong") + WASHER_CLASSES));

    let output = blt(&["check", &repo_arg(&dir)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Collection: bad.blt"));
}

#[test]
fn classes_lists_status_and_replacement() {
    let dir = sample_repo("classes_list");
    let output = blt(&["classes", &repo_arg(&dir)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.contains(&"DIN931\thexscrew1\thex\twithdrawn\treplaced by DINENISO4014"));
    assert!(lines.contains(&"ISO4014\thexscrew1\thex\twithdrawn"));
    assert!(lines.contains(&"washer1\twasher1\twasher"));
}

// ---------------------------------------------------------------------------
// params
// ---------------------------------------------------------------------------

#[test]
fn params_uses_defaults_and_base() {
    let dir = sample_repo("params_defaults");
    let output = blt(&["params", &repo_arg(&dir), "DIN931"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["class"], "DIN931");
    assert_eq!(json["name"], "Hex screw M3 x 20");
    assert_eq!(json["values"]["s"], 5.5);
    assert_eq!(json["values"]["thread"], "metric");
    assert_eq!(json["incantation"], r#"hex_screw(3, 2, 5.5, 20, "metric")"#);
}

#[test]
fn params_set_overrides_defaults() {
    let dir = sample_repo("params_set");
    let output = blt(&[
        "params",
        &repo_arg(&dir),
        "ISO4014",
        "--set",
        "key=M4",
        "--set",
        "l=35",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["name"], "Hex screw M4 x 35");
    assert_eq!(json["values"]["d1"], 4.0);
    assert_eq!(json["values"]["l"], 35.0);
}

#[test]
fn params_bool_parameter() {
    let dir = sample_repo("params_bool");
    let output = blt(&["params", &repo_arg(&dir), "washer1", "--set", "chamfered=True"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["values"]["chamfered"], true);
    assert!(json.get("incantation").is_none());
}

#[test]
fn params_without_base() {
    let dir = sample_repo("params_no_base");
    let output = blt(&["params", &repo_arg(&dir), "DIN931", "--no-base"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json["values"].get("thread").is_none());
    assert!(json.get("incantation").is_none());
}

#[test]
fn params_yaml_output() {
    let dir = sample_repo("params_yaml");
    let output = blt(&["params", &repo_arg(&dir), "DIN931", "--format", "yaml"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("name: Hex screw M3 x 20"));
}

#[test]
fn params_rejects_non_free_parameter() {
    let dir = sample_repo("params_non_free");
    let output = blt(&["params", &repo_arg(&dir), "DIN931", "--set", "s=4"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: 's' is not a free parameter"));
}

#[test]
fn params_rejects_invalid_value() {
    let dir = sample_repo("params_invalid");
    let output = blt(&["params", &repo_arg(&dir), "DIN931", "--set", "l=-3"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error: "));
}

#[test]
fn params_reports_missing_row() {
    let dir = sample_repo("params_missing_row");
    let output = blt(&["params", &repo_arg(&dir), "DIN931", "--set", "key=M8"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("M8"));
}

#[test]
fn params_unknown_class() {
    let dir = sample_repo("params_unknown");
    let output = blt(&["params", &repo_arg(&dir), "ISO4017"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Unknown class 'ISO4017'"));
}

#[test]
fn config_file_disables_openscad() {
    let dir = sample_repo("config_openscad");
    let config = dir.join("options.yml");
    fs::write(&config, "openscad: false\nparallel: false\n").unwrap();

    let output = blt(&[
        "--config",
        &config.display().to_string(),
        "params",
        &repo_arg(&dir),
        "DIN931",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json.get("incantation").is_none());
}

// ---------------------------------------------------------------------------
// common
// ---------------------------------------------------------------------------

#[test]
fn common_prints_one_line_per_combination() {
    let dir = sample_repo("common_lines");
    let output = blt(&["common", &repo_arg(&dir), "washer1"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["M3, True", "M3, False", "M4, True", "M4, False"]);
}

#[test]
fn common_fails_for_continuous_parameters() {
    let dir = sample_repo("common_continuous");
    let output = blt(&["common", &repo_arg(&dir), "DIN931"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no enumerable common parameters"));
}
