// cli_flow.rs - End-to-end test of the `pm` binary against a temp project.
//
// Flow:
//   1. pm user add → one manager, one employee
//   2. manager sets a goal and starts it
//   3. employee proposes a task, manager approves, employee finishes it
//   4. manager leaves feedback and completes the goal
//   5. new tasks are refused; the feedback chain verifies

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn pm(root: &Path, login: Option<(&str, &str)>, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pm"));
    cmd.arg("--project-root")
        .arg(root)
        .args(args)
        .env_remove("PM_USER")
        .env_remove("PM_PASSWORD")
        .env_remove("PM_NEW_PASSWORD")
        .env("RUST_LOG", "off");
    if let Some((user, password)) = login {
        cmd.env("PM_USER", user).env("PM_PASSWORD", password);
    }
    cmd.output().unwrap()
}

fn ok(output: Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn err(output: Output) -> String {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    String::from_utf8(output.stderr).unwrap()
}

/// The rest of the first line in `out` that starts with `label`.
fn id_after(out: &str, label: &str) -> String {
    let line = out.lines().find(|l| l.starts_with(label)).unwrap();
    line[label.len()..].trim().to_string()
}

const MIA: Option<(&str, &str)> = Some(("mia", "mia-pw"));
const ELI: Option<(&str, &str)> = Some(("eli", "eli-pw"));

fn provision(root: &Path) {
    ok(pm(
        root,
        None,
        &["user", "add", "mia", "--role", "manager", "--credential", "mia-pw"],
    ));
    ok(pm(
        root,
        None,
        &[
            "user",
            "add",
            "eli",
            "--role",
            "employee",
            "--manager",
            "mia",
            "--credential",
            "eli-pw",
            "--display-name",
            "Eli Park",
        ],
    ));
}

#[test]
fn goal_to_completion_through_the_cli() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    provision(root);

    // Team listing.
    let team = ok(pm(root, MIA, &["team"]));
    assert!(team.contains("Eli Park"));
    let manager = ok(pm(root, ELI, &["manager"]));
    assert!(manager.contains("mia"));

    // Goal set and started.
    let out = ok(pm(
        root,
        MIA,
        &["goal", "set", "eli", "Own the release process", "--due", "2026-12-31"],
    ));
    let goal_id = id_after(&out, "Goal set:");
    ok(pm(root, MIA, &["goal", "status", &goal_id, "in_progress"]));

    // Task proposed, approved, worked.
    let out = ok(pm(root, ELI, &["task", "add", &goal_id, "Write the release checklist"]));
    let task_id = id_after(&out, "Task proposed:");
    let denied = err(pm(root, ELI, &["task", "approve", &task_id]));
    assert!(denied.contains("not authorized"));
    ok(pm(root, MIA, &["task", "approve", &task_id]));
    ok(pm(root, ELI, &["task", "progress", &task_id, "in_progress"]));
    ok(pm(root, ELI, &["task", "progress", &task_id, "completed"]));

    let list = ok(pm(root, ELI, &["task", "list", &goal_id]));
    assert!(list.contains("approved"));
    assert!(list.contains("completed"));

    // Feedback and completion.
    ok(pm(root, MIA, &["feedback", "add", &goal_id, "Smooth first release."]));
    ok(pm(root, MIA, &["goal", "status", &goal_id, "completed"]));

    let closed = err(pm(root, ELI, &["task", "add", &goal_id, "Late addition"]));
    assert!(closed.contains("accepts no new tasks"));

    let feedback = ok(pm(root, ELI, &["feedback", "list", &goal_id]));
    assert!(feedback.contains("Smooth first release."));

    let verified = ok(pm(root, None, &["verify"]));
    assert!(verified.contains("hash chain intact"));

    // The JSON dashboard carries the whole picture and no credential hashes.
    let board = ok(pm(root, MIA, &["dashboard", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&board).unwrap();
    assert_eq!(json["teams"][0]["employee"]["username"], "eli");
    assert_eq!(json["teams"][0]["goals"][0]["goal"]["status"], "completed");
    assert!(!board.contains("argon2"));
}

#[test]
fn bad_credentials_are_refused() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    provision(root);

    let out = err(pm(root, Some(("mia", "wrong")), &["goal", "list"]));
    assert!(out.contains("invalid username or credential"));
    let out = err(pm(root, Some(("nobody", "mia-pw")), &["goal", "list"]));
    assert!(out.contains("invalid username or credential"));
    let out = err(pm(root, None, &["goal", "list"]));
    assert!(out.contains("--user"));
}

#[test]
fn verify_detects_edited_feedback() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    provision(root);

    let out = ok(pm(
        root,
        MIA,
        &["goal", "set", "eli", "Pair on reviews", "--due", "2026-09-30"],
    ));
    let goal_id = id_after(&out, "Goal set:");
    ok(pm(root, MIA, &["feedback", "add", &goal_id, "Good start."]));
    ok(pm(root, MIA, &["feedback", "add", &goal_id, "Keep it up."]));

    let log = root.join(".pm/feedback.jsonl");
    let content = fs::read_to_string(&log).unwrap();
    fs::write(&log, content.replace("Good start.", "Needs work.")).unwrap();

    let out = pm(root, None, &["verify"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("INTEGRITY VIOLATION"));
}

#[test]
fn goal_set_only_names_your_own_reports() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    provision(root);
    ok(pm(
        root,
        None,
        &["user", "add", "omar", "--role", "manager", "--credential", "omar-pw"],
    ));
    let omar = Some(("omar", "omar-pw"));

    // Someone else's report and a username nobody has look the same.
    let other_team = err(pm(root, omar, &["goal", "set", "eli", "Poach", "--due", "2026-10-01"]));
    let nobody = err(pm(root, omar, &["goal", "set", "ghost", "Poach", "--due", "2026-10-01"]));
    for out in [&other_team, &nobody] {
        assert!(out.contains("not authorized"), "{}", out);
        assert!(out.contains("is not one of your employees"), "{}", out);
    }

    // Employees learn nothing about which usernames exist.
    for name in ["mia", "ghost"] {
        let out = err(pm(root, ELI, &["goal", "set", name, "Mine", "--due", "2026-10-01"]));
        assert!(out.contains("not authorized"), "{}", out);
        assert!(!out.contains("No user named"), "{}", out);
    }

    let listed = ok(pm(root, MIA, &["goal", "list"]));
    assert!(listed.contains("No goals found."));
}
