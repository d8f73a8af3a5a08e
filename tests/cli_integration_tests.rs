//! CLI smoke tests against file-backed snapshots in an isolated workspace.

mod common;

use std::collections::HashSet;
use std::fs;

use common::{Workspace, sample_snapshot};
use serde_json::{Value, json};

#[test]
fn help_command_prints_usage() {
    let workspace = Workspace::new();
    let result = workspace.run("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: cfm [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let workspace = Workspace::new();
    let result = workspace.run("version_command_prints_version", &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_command_emits_script() {
    let workspace = Workspace::new();
    let result = workspace.run("completions_command_emits_script", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("cfm"));
}

#[test]
fn unknown_time_range_is_rejected() {
    let workspace = Workspace::with_sample();
    let result = workspace.run("unknown_time_range_is_rejected", &["status", "--range", "2w"]);
    assert!(!result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("unknown time range"));
}

#[test]
fn status_reports_counts() {
    let workspace = Workspace::with_sample();
    let result = workspace.run("status_reports_counts", &["--json", "status"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload = result.json();
    assert_eq!(payload["time_range"], "24h");
    assert_eq!(payload["entities"], 3);
    assert_eq!(payload["relations"], 2);
    assert_eq!(payload["updates"]["total"], 3);
    assert_eq!(payload["conflicts"]["high"], 1);
    assert_eq!(payload["conflicts"]["medium"], 0);
    assert_eq!(payload["conflicts"]["low"], 1);
}

#[test]
fn status_honors_range_flag_when_piped() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "status_honors_range_flag_when_piped",
        &["--no-color", "status", "--range", "7d"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    // stdout is a pipe, so JSON is the default unless asked otherwise.
    assert_eq!(result.json()["time_range"], "7d");
}

#[test]
fn per_range_snapshot_wins_over_fallback() {
    let workspace = Workspace::with_sample();
    let mut week = sample_snapshot();
    week["entities"]
        .as_array_mut()
        .expect("entities array")
        .truncate(1);
    workspace.write_snapshot("7d.json", &week);

    let day = workspace.run("per_range_day", &["--json", "status", "--range", "24h"]);
    let week = workspace.run("per_range_week", &["--json", "status", "--range", "7d"]);
    assert_eq!(day.json()["entities"], 3);
    assert_eq!(week.json()["entities"], 1);
}

#[test]
fn missing_snapshot_fails_with_banner() {
    let workspace = Workspace::new();
    let result = workspace.run("missing_snapshot_fails_with_banner", &["--json", "status"]);
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(
        result.stderr.contains("Failed to load data flow"),
        "log: {}",
        result.log_path.display()
    );

    let events: Vec<Value> = workspace
        .activity_lines()
        .into_iter()
        .map(|line| line["event"].clone())
        .collect();
    assert!(events.contains(&Value::from("fetch_failed")));
}

#[test]
fn hit_on_node_returns_detail_panel() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "hit_on_node_returns_detail_panel",
        &["--json", "hit", "--x", "552", "--y", "298"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let hit = &result.json()["hit"];
    assert_eq!(hit["id"], "cg-1");
    assert_eq!(hit["name"], "Grace Hopper");
    assert_eq!(hit["type_label"], "Caregiver");
    assert_eq!(hit["has_conflict"], true);
}

#[test]
fn hit_on_empty_canvas_returns_null() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "hit_on_empty_canvas_returns_null",
        &["--json", "hit", "--x", "400", "--y", "300"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.json()["hit"].is_null());
}

#[test]
fn history_filters_and_expands_entity_cards() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "history_filters_and_expands_entity_cards",
        &["--json", "history", "--entity", "client-1", "--expand"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let panel = result.json();
    let cards = panel["cards"].as_array().expect("cards array");
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c["entity_name"] == "Ada Lovelace"));

    let modified = &cards[0];
    assert_eq!(modified["update_id"], "upd-1");
    assert_eq!(modified["expanded"], true);
    let diff = modified["diff"].as_array().expect("diff array");
    assert_eq!(diff.len(), 2);
    assert_eq!(diff[0]["field"], "carePlan");
    assert_eq!(diff[1]["previous"], "—");

    let created = &cards[1];
    assert_eq!(created["user"], "System");
    assert_eq!(created["expandable"], false);
}

#[test]
fn history_for_quiet_entity_reports_notice() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "history_for_quiet_entity_reports_notice",
        &["--json", "history", "--entity", "sched-1"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let notice = result.json();
    assert_eq!(notice["title"], "No Updates Found");
    assert_eq!(notice["message"], "No updates found for Morning Visit.");
}

/// Forty clients on the default ring overlap their neighbours.
fn crowded_snapshot() -> Value {
    let entities: Vec<Value> = (0..40)
        .map(|i| {
            json!({
                "id": format!("client-{i}"),
                "type": "client",
                "name": format!("Client {i}"),
            })
        })
        .collect();
    json!({
        "entities": entities,
        "updates": [{
            "id": "upd-10",
            "entityId": "client-10",
            "entityType": "client",
            "entityName": "Client 10",
            "timestamp": "2026-10-01T09:30:00Z",
            "updateType": "modify",
            "userId": "coord-7"
        }]
    })
}

#[test]
fn entity_filter_works_on_crowded_ring() {
    let workspace = Workspace::new();
    workspace.write_snapshot("snapshot.json", &crowded_snapshot());

    let history = workspace.run(
        "entity_filter_works_on_crowded_ring",
        &["--json", "history", "--entity", "client-10"],
    );
    assert!(history.status.success(), "log: {}", history.log_path.display());
    let cards = history.json()["cards"].as_array().expect("cards array").clone();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["update_id"], "upd-10");

    let conflicts = workspace.run(
        "entity_filter_works_on_crowded_ring_conflicts",
        &["--json", "conflicts", "--entity", "client-11"],
    );
    assert!(conflicts.status.success(), "log: {}", conflicts.log_path.display());
    assert_eq!(conflicts.json()["title"], "No Conflicts Found");

    let out = workspace.root().join("crowded.svg");
    let out_arg = out.to_string_lossy().to_string();
    let render = workspace.run(
        "entity_filter_works_on_crowded_ring_render",
        &["--json", "render", "--select", "client-12", "--out", &out_arg],
    );
    assert!(render.status.success(), "log: {}", render.log_path.display());
    assert_eq!(render.json()["entities"], 40);
}

#[test]
fn conflicts_lists_every_active_conflict() {
    let workspace = Workspace::with_sample();
    let result = workspace.run("conflicts_lists_every_active_conflict", &["--json", "conflicts"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let panel = result.json();
    let ids: HashSet<&str> = panel["items"]
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|item| item["id"].as_str())
        .collect();
    assert_eq!(ids, HashSet::from(["conf-1", "conf-2"]));
    assert!(panel["empty"].is_null());
}

#[test]
fn conflicts_for_entity_without_conflicts_reports_notice() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "conflicts_for_entity_without_conflicts_reports_notice",
        &["--json", "conflicts", "--entity", "sched-1"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(result.json()["title"], "No Conflicts Found");
}

#[test]
fn unknown_entity_is_a_user_error() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "unknown_entity_is_a_user_error",
        &["--json", "conflicts", "--entity", "ghost"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("unknown entity: ghost"));
}

#[test]
fn resolve_hides_conflict_on_refetch() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "resolve_hides_conflict_on_refetch",
        &["--json", "resolve", "conf-1", "--option", "keep-first"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload = result.json();
    assert_eq!(payload["resolved"], "conf-1");
    assert_eq!(payload["option"], "keep-first");
    assert_eq!(payload["remaining_conflicts"], 1);

    let log = fs::read_to_string(workspace.snapshot_dir().join("resolutions.jsonl"))
        .expect("resolution log written");
    assert!(log.contains("\"conflictId\":\"conf-1\""));

    let after = workspace.run("resolve_hides_conflict_after", &["--json", "conflicts"]);
    let items = after.json()["items"].as_array().expect("items").clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "conf-2");
}

#[test]
fn resolve_unknown_conflict_is_a_user_error() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "resolve_unknown_conflict_is_a_user_error",
        &["--json", "resolve", "conf-404"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("CFM-2003"));
}

#[test]
fn resolve_with_unknown_option_fails() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "resolve_with_unknown_option_fails",
        &["--json", "resolve", "conf-1", "--option", "nope"],
    );
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("unknown resolution option nope"));
    assert!(!workspace.snapshot_dir().join("resolutions.jsonl").exists());
}

#[test]
fn render_writes_svg_file() {
    let workspace = Workspace::with_sample();
    let out = workspace.root().join("flow.svg");
    let out_arg = out.to_string_lossy().to_string();
    let result = workspace.run(
        "render_writes_svg_file",
        &["--json", "render", "--select", "client-1", "--out", &out_arg],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(result.json()["entities"], 3);

    let svg = fs::read_to_string(&out).expect("svg written");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Ada Lovelace"));
    assert!(svg.trim_end().ends_with("</svg>"));
}

#[test]
fn render_json_emits_draw_commands() {
    let workspace = Workspace::with_sample();
    let result = workspace.run("render_json_emits_draw_commands", &["--json", "render"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let commands = result.json();
    assert!(commands.as_array().is_some_and(|c| !c.is_empty()));
}

#[test]
fn watch_prints_one_line_per_cycle() {
    let workspace = Workspace::with_sample();
    let result = workspace.run(
        "watch_prints_one_line_per_cycle",
        &["--json", "watch", "--interval", "1", "--cycles", "2"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines: Vec<Value> = result
        .stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("watch line is JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["cycle"], 1);
    assert_eq!(lines[1]["cycle"], 2);
    assert_eq!(lines[1]["conflicts"]["high"], 1);

    let events: Vec<Value> = workspace
        .activity_lines()
        .into_iter()
        .map(|line| line["event"].clone())
        .collect();
    assert!(events.contains(&Value::from("timer_started")));
    assert!(events.contains(&Value::from("conflict_alert")));
}

#[test]
fn watch_rejects_zero_interval() {
    let workspace = Workspace::with_sample();
    let result = workspace.run("watch_rejects_zero_interval", &["watch", "--interval", "0"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}
