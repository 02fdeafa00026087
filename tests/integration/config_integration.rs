//! Configuration loading and system assembly through the CLI route layer.

use rowsync::cli::{Commands, RunContext};
use rowsync::config::ConfigLoader;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let sled_path = dir.path().join("sql-store");
    let oplog_path = dir.path().join("sql-oplog");
    let config_path = dir.path().join("rowsync.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[logging]
level = "warn"

[systems.hive]
backend = "memory"
table = "grades"
columns = ["student_id", "course_id", "roll_no", "grade"]
key_columns = 2

[systems.sql]
backend = "sled"
path = "{}"
oplog_path = "{}"
table = "grades"
columns = ["student_id", "course_id", "roll_no", "grade"]
key_columns = 2
"#,
            sled_path.display(),
            oplog_path.display()
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn context_builds_systems_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);

    let config = ConfigLoader::load(Some(&config_path)).unwrap();
    assert_eq!(config.logging.level, "warn");

    let context = RunContext::new(&config).unwrap();
    assert_eq!(
        context.interpreter().system_names(),
        vec!["HIVE".to_string(), "SQL".to_string()]
    );
}

#[test]
fn commands_run_against_configured_systems() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);
    let config = ConfigLoader::load(Some(&config_path)).unwrap();
    let context = RunContext::new(&config).unwrap();

    context
        .execute(&Commands::Exec {
            line: "1, HIVE.SET((S1, C1), 7, A)".to_string(),
        })
        .unwrap();
    context
        .execute(&Commands::Merge {
            target: "sql".to_string(),
            source: "hive".to_string(),
        })
        .unwrap();

    let shown = context
        .execute(&Commands::Show {
            system: "sql".to_string(),
        })
        .unwrap();
    assert!(shown.contains("S1"));
    assert!(shown.contains("A"));

    let log = context
        .execute(&Commands::Log {
            system: "sql".to_string(),
        })
        .unwrap();
    assert!(log.contains("SET"));
}

#[test]
fn command_file_runs_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir);
    let config = ConfigLoader::load(Some(&config_path)).unwrap();
    let context = RunContext::new(&config).unwrap();

    let script_path = dir.path().join("testcase.in");
    fs::write(
        &script_path,
        "1, HIVE.SET((S1, C1), 7, A)\nSQL.MERGE(HIVE)\n2, SQL.GET(S1, C1)\n",
    )
    .unwrap();

    let summary = context
        .execute(&Commands::Run { file: script_path })
        .unwrap();
    assert!(summary.contains("3 executed"));
    assert!(summary.contains("0 parse failures"));
}
