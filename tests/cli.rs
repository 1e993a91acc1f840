//! CLI surface tests. These avoid spawning a Python worker except through a
//! deliberately unusable interpreter path, so they run on any host.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_screen_accepts_plain_plotting_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("ok.py");
    std::fs::write(
        &script,
        "import matplotlib.pyplot as plt\nplt.plot([1, 2, 3])\nplt.show()\n",
    )
    .unwrap();

    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["screen"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"));
}

#[test]
fn test_screen_rejects_forbidden_function() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bad.py");
    std::fs::write(&script, "result = eval('2+2')\n").unwrap();

    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["screen"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden function: eval"));
}

#[test]
fn test_classify_reads_stdin() {
    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["classify"])
        .write_stdin("NameError: name 'xs' is not defined\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Name error: name 'xs' is not defined"));
}

#[test]
fn test_run_reports_classified_failure_for_unusable_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.py");
    std::fs::write(&script, "print('hi')\n").unwrap();

    let config_path = dir.path().join("config.json");
    let workspace_base = dir.path().join("ws");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "python": "/nonexistent/plotbox-python",
            "workspace_base": workspace_base,
        })
        .to_string(),
    )
    .unwrap();

    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["run"])
        .arg(&script)
        .args(["--out"])
        .arg(dir.path().join("out"))
        .args(["--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_run_json_failure_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.py");
    std::fs::write(&script, "print('hi')\n").unwrap();

    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "python": "/nonexistent/plotbox-python",
            "workspace_base": dir.path().join("ws"),
        })
        .to_string(),
    )
    .unwrap();

    // The exit code must signal failure in JSON mode too, not just plain mode
    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["run"])
        .arg(&script)
        .args(["--json", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"failed\""));
}

#[test]
fn test_cleanup_stale_on_empty_base() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        serde_json::json!({ "workspace_base": dir.path().join("ws") }).to_string(),
    )
    .unwrap();

    Command::cargo_bin("plotbox")
        .unwrap()
        .args(["cleanup-stale", "--max-age-secs", "60", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 0 stale workspace(s)"));
}
