//! CLIの統合テスト
//!
//! 実際のgitリポジトリを一時ディレクトリに作成し、
//! `multigit` バイナリをエンドツーエンドで実行する

mod common;

use common::TestWorkspace;
use predicates::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_register_list_unregister() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    let beta = ws.init_repo("beta");

    ws.multigit()
        .arg("register")
        .arg(&alpha)
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered alpha"));
    ws.multigit()
        .args(["register", "--name", "b", "--no-push"])
        .arg(&beta)
        .assert()
        .success();

    let config = ws.read_config();
    assert!(config.contains("[repositories.alpha]"), "{config}");
    assert!(config.contains("[repositories.b]"), "{config}");
    assert!(config.contains("no-push = true"), "{config}");

    ws.multigit()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha").and(predicate::str::contains("no push")));

    ws.multigit()
        .args(["unregister", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unregistered b"));
    ws.multigit()
        .args(["unregister", "b"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("'b' is not registered"));
}

#[test]
fn test_register_twice_is_rejected() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.register_all(&[&alpha]);

    ws.multigit()
        .arg("register")
        .arg(&alpha)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("already registered as 'alpha'"));

    assert_eq!(ws.read_config().matches("[repositories.").count(), 1);
}

#[test]
fn test_register_rejects_blank_name() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");

    ws.multigit()
        .args(["register", "--name", " "])
        .arg(&alpha)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("is empty"));
    assert!(!ws.read_config().contains("[repositories."));
}

#[test]
fn test_register_rejects_plain_directory() {
    let ws = TestWorkspace::new();
    let plain = ws.root().join("plain");
    std::fs::create_dir_all(&plain).unwrap();

    ws.multigit()
        .arg("register")
        .arg(&plain)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not a git working tree"));
}

#[test]
fn test_list_json_with_filter() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    let beta = ws.init_repo("beta");
    let gamma = ws.init_repo("gamma");
    ws.make_dirty(&alpha);
    ws.make_dirty(&gamma);
    ws.register_all(&[&alpha, &beta, &gamma]);

    let output = ws
        .multigit()
        .args(["list", "-f", "dirty,not-name:gamma", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let identities: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["identity"].as_str().unwrap())
        .collect();
    assert_eq!(identities, vec!["alpha"]);
}

#[test]
fn test_status_runs_in_every_repository() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    let beta = ws.init_repo("beta");
    ws.register_all(&[&alpha, &beta]);

    ws.multigit()
        .args(["status", "--", "--short", "--branch"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(":: alpha")
                .and(predicate::str::contains(":: beta"))
                .and(predicate::str::contains("## main"))
                .and(predicate::str::contains("2 succeeded, 0 failed, 0 skipped, 0 cancelled")),
        );
}

#[test]
fn test_bad_filter_fails_before_dispatch() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.register_all(&[&alpha]);

    ws.multigit()
        .args(["exec", "-f", "drity", "touch ran"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown filter clause 'drity'"));

    assert!(!alpha.join("ran").exists());
}

#[test]
fn test_exec_failure_is_isolated() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    let beta = ws.init_repo("beta");
    let gamma = ws.init_repo("gamma");
    std::fs::write(beta.join("fail-here"), "").unwrap();
    ws.register_all(&[&alpha, &beta, &gamma]);

    let output = ws
        .multigit()
        .args(["exec", "-o", "json", "test ! -e fail-here"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses: Vec<(&str, &str)> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["repository"]["identity"].as_str().unwrap(),
                e["status"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        statuses,
        vec![("alpha", "succeeded"), ("beta", "failed"), ("gamma", "succeeded")]
    );
    assert_eq!(report["summary"]["failed"], 1);
}

#[test]
fn test_exec_runs_in_repository_directory() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.register_all(&[&alpha]);

    ws.multigit()
        .args(["exec", "touch", "marker file"])
        .assert()
        .success();

    assert!(alpha.join("marker file").exists());
}

#[test]
fn test_push_skips_no_push_repository() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.add_remote(&alpha, "origin");
    ws.multigit()
        .args(["register", "--no-push"])
        .arg(&alpha)
        .assert()
        .success();

    ws.multigit()
        .arg("push")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("skipped: no-push")
                .and(predicate::str::contains("0 succeeded, 0 failed, 1 skipped")),
        );
}

#[test]
fn test_ui_without_launcher_is_fatal() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.register_all(&[&alpha]);

    ws.multigit()
        .arg("ui")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No gitui configured"));
}

#[test]
fn test_info_reports_state() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    ws.make_dirty(&alpha);
    ws.add_remote(&alpha, "origin");
    ws.register_all(&[&alpha]);

    ws.multigit()
        .arg("info")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("repository")
                .and(predicate::str::contains("main"))
                .and(predicate::str::contains("dirty")),
        );
}

#[test]
fn test_config_path_show_and_clean() {
    let ws = TestWorkspace::new();
    let alpha = ws.init_repo("alpha");
    let beta = ws.init_repo("beta");
    ws.register_all(&[&alpha, &beta]);

    ws.multigit()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(ws.config_path().display().to_string()));

    ws.multigit()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[repositories.beta]"));

    std::fs::remove_dir_all(&beta).unwrap();
    ws.multigit()
        .args(["config", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed beta"));

    let config = ws.read_config();
    assert!(config.contains("[repositories.alpha]"), "{config}");
    assert!(!config.contains("[repositories.beta]"), "{config}");

    ws.multigit()
        .args(["config", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to clean"));
}

#[test]
fn test_malformed_config_is_fatal() {
    let ws = TestWorkspace::new();
    std::fs::create_dir_all(ws.config_path().parent().unwrap()).unwrap();
    std::fs::write(ws.config_path(), "[commands.push]\nfilter = \"nonsense\"\n").unwrap();

    ws.multigit().arg("list").assert().code(3);
}

/// Ctrl-C from the terminal: SIGINT to the whole foreground process group.
#[cfg(unix)]
#[test]
fn test_interrupt_cancels_every_running_repository() {
    use rustix::process::{kill_process_group, test_kill_process, Pid, Signal};
    use std::os::unix::process::CommandExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let ws = TestWorkspace::new();
    let repos: Vec<_> = ["alpha", "beta", "gamma"]
        .iter()
        .map(|name| ws.init_repo(name))
        .collect();
    ws.register_all(&repos.iter().map(|p| p.as_path()).collect::<Vec<_>>());

    let child = ws
        .multigit_process()
        .args(["exec", "-j", "3", "-o", "json", "echo $$ > sleep.pid; exec sleep 30"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .unwrap();
    let group = Pid::from_raw(child.id() as i32).unwrap();

    // Wait until every repository's child is running
    let pid_files: Vec<_> = repos.iter().map(|repo| repo.join("sleep.pid")).collect();
    let deadline = Instant::now() + Duration::from_secs(20);
    let sleepers: Vec<Pid> = loop {
        let pids: Vec<Pid> = pid_files
            .iter()
            .filter_map(|file| std::fs::read_to_string(file).ok())
            .filter_map(|contents| contents.trim().parse::<i32>().ok())
            .filter_map(Pid::from_raw)
            .collect();
        if pids.len() == repos.len() {
            break pids;
        }
        assert!(Instant::now() < deadline, "children did not start");
        std::thread::sleep(Duration::from_millis(20));
    };

    kill_process_group(group, Signal::INT).unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(
        output.status.code(),
        Some(130),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["cancelled"; 3]);
    assert_eq!(report["summary"]["cancelled"], 3);

    for pid in sleepers {
        assert!(test_kill_process(pid).is_err(), "sleep {pid:?} survived the interrupt");
    }
}
