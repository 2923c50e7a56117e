//! CLI integration tests for dwh-etl.
//!
//! These tests cover argument parsing, help output, dry runs and exit
//! codes for configuration and connection failures. None of them needs a
//! reachable warehouse.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get a command for the dwh-etl binary.
fn cmd() -> Command {
    Command::cargo_bin("dwh-etl").unwrap()
}

/// A complete configuration pointing at a closed local port.
const CONFIG: &str = r#"
cluster:
  host: 127.0.0.1
  db_name: dwh
  db_user: dwhuser
  db_password: Passw0rd
  db_port: 1
  ssl_mode: disable
iam_role:
  arn: arn:aws:iam::123456789012:role/dwhRole
s3:
  log_data: s3://udacity-dend/log_data
  log_jsonpath: s3://udacity-dend/log_json_path.json
  song_data: s3://udacity-dend/song_data
"#;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("create-tables"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("health-check"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_preview_subcommand_help() {
    cmd()
        .args(["preview", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--events"))
        .stdout(predicate::str::contains("--songs"))
        .stdout(predicate::str::contains("[default: all_distinct]"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dwh-etl"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_config_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("[default: dwh.yaml]"));
}

#[test]
fn test_log_format_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_no_subcommand_fails() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// =============================================================================
// Configuration Error Tests
// =============================================================================

#[test]
fn test_missing_config_file_exits_io() {
    cmd()
        .args(["--config", "/nonexistent/dwh.yaml", "run"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_config() {
    let file = config_file("cluster: [unclosed");
    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("run")
        .assert()
        .code(1);
}

#[test]
fn test_empty_config_exits_config() {
    let file = config_file("");
    cmd()
        .arg("--config")
        .arg(file.path())
        .args(["run", "--dry-run"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_key_is_named() {
    let file = config_file(&CONFIG.replace("  arn: arn:aws:iam::123456789012:role/dwhRole\n", ""));
    cmd()
        .arg("--config")
        .arg(file.path())
        .args(["run", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[iam_role] arn"));
}

#[test]
fn test_invalid_s3_location_exits_config() {
    let file = config_file(&CONFIG.replace("s3://udacity-dend/song_data", "udacity-dend/song_data"));
    cmd()
        .arg("--config")
        .arg(file.path())
        .args(["run", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("s3.song_data"));
}

// =============================================================================
// Dry Run Tests
// =============================================================================

#[test]
fn test_dry_run_lists_statements_in_order() {
    let file = config_file(CONFIG);
    let output = cmd()
        .arg("--config")
        .arg(file.path())
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: 7 statements"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let order = [
        "staging_events_copy",
        "staging_songs_copy",
        "songplays_insert",
        "users_insert",
        "songs_insert",
        "artists_insert",
        "time_insert",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|name| stdout.find(name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_dry_run_json_includes_sql() {
    let file = config_file(CONFIG);
    cmd()
        .arg("--config")
        .arg(file.path())
        .args(["--output-json", "run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"staging\""))
        .stdout(predicate::str::contains(
            "CREDENTIALS 'aws_iam_role=arn:aws:iam::123456789012:role/dwhRole'",
        ))
        .stdout(predicate::str::contains("REGION 'us-west-2'"));
}

#[test]
fn test_dry_run_events_default_format_ignores_case() {
    let file = config_file(&CONFIG.replace(
        "  log_jsonpath: s3://udacity-dend/log_json_path.json\n",
        "",
    ));
    cmd()
        .arg("--config")
        .arg(file.path())
        .args(["--output-json", "run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FORMAT AS JSON 'auto ignorecase'"));
}

// =============================================================================
// Connection Error Tests
// =============================================================================

#[test]
fn test_health_check_unreachable_exits_connection() {
    let file = config_file(CONFIG);
    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("health-check")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("Passw0rd").not());
}

#[test]
fn test_run_unreachable_exits_connection() {
    let file = config_file(CONFIG);
    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Connection error"));
}

// =============================================================================
// Preview Tests
// =============================================================================

#[test]
fn test_preview_counts_rows() {
    let events = config_file(concat!(
        r#"{"artist":"Muse","song":"Supermassive Black Hole","length":209.5,"page":"NextSong","ts":1541990258796,"userId":"73","firstName":"Jacob","lastName":"Klein","gender":"M","level":"paid","sessionId":954}"#,
        "\n",
        r#"{"page":"Home","ts":1541990300000,"userId":""}"#,
        "\n",
    ));
    let songs = config_file(
        r#"{"num_songs":1,"artist_id":"AR1","artist_name":"Muse","song_id":"SO1","title":"Supermassive Black Hole","duration":210.2,"year":2006}"#,
    );

    cmd()
        .args(["--output-json", "preview", "--events"])
        .arg(events.path())
        .arg("--songs")
        .arg(songs.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"songplays\": 1"))
        .stdout(predicate::str::contains("\"song_plays\": 1"));
}

#[test]
fn test_preview_invalid_policy_exits_config() {
    let events = config_file("");
    let songs = config_file("");
    cmd()
        .args(["preview", "--user-conflict-policy", "newest", "--events"])
        .arg(events.path())
        .arg("--songs")
        .arg(songs.path())
        .assert()
        .code(1);
}
