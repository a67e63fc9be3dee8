use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_topicgroup"))
}

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(binary())
        .args(args)
        .current_dir(cwd)
        .env("TOPICGROUP_LOG_LEVEL", "error")
        .output()
        .expect("Failed to run binary")
}

fn write_input(dir: &Path, lines: &[&str]) -> Result<PathBuf> {
    let path = dir.join("records.jsonl");
    let mut file = std::fs::File::create(&path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(path)
}

fn read_offsets(path: &Path) -> Result<Vec<i64>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line)?;
            Ok(value["offset"].as_i64().unwrap_or(-1))
        })
        .collect()
}

#[test]
fn test_cli_help() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["--help"], temp_dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Group partitioned records"));
    assert!(stdout.contains("group"));
    assert!(stdout.contains("render"));
    assert!(stdout.contains("--config"));
}

#[test]
fn test_cli_groups_records_into_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_input(
        temp_dir.path(),
        &[
            r#"{"topic":"t","partition":0,"offset":10,"value":"a"}"#,
            r#"{"topic":"t","partition":0,"offset":11,"value":"b"}"#,
            r#"{"topic":"t","partition":0,"offset":12,"value":"c"}"#,
            r#"{"topic":"t","partition":0,"offset":13,"value":"d"}"#,
        ],
    )?;
    let output_dir = temp_dir.path().join("out");

    let output = run(
        &[
            "group",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output_dir.to_str().unwrap(),
            "--max-records",
            "2",
        ],
        temp_dir.path(),
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["records"], 4);
    assert_eq!(summary["batches"], 2);

    assert_eq!(read_offsets(&output_dir.join("t-0-10"))?, vec![10, 11]);
    assert_eq!(read_offsets(&output_dir.join("t-0-12"))?, vec![12, 13]);
    Ok(())
}

#[test]
fn test_cli_render_padded_key() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(
        &[
            "--template",
            "{{topic}}-{{partition}}-{{start_offset:padding=true}}",
            "render",
            "--topic",
            "orders",
            "--partition",
            "1",
            "--offset",
            "5",
        ],
        temp_dir.path(),
    );

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "orders-1-00000000000000000005"
    );
}

#[test]
fn test_cli_rejects_template_without_offset() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(
        &[
            "--template",
            "{{topic}}-{{partition}}",
            "render",
            "--topic",
            "orders",
            "--partition",
            "0",
            "--offset",
            "0",
        ],
        temp_dir.path(),
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("start_offset"));
}

#[test]
fn test_cli_template_flag_overrides_invalid_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_path,
        "[grouper]\nfile_name_template = \"{{topic}}\"\n",
    )?;

    let output = run(
        &[
            "--config",
            config_path.to_str().unwrap(),
            "--template",
            "{{topic}}-{{partition}}-{{start_offset}}",
            "render",
            "--topic",
            "orders",
            "--partition",
            "2",
            "--offset",
            "9",
        ],
        temp_dir.path(),
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "orders-2-9");

    // Without the override the file's template is still rejected
    let output = run(
        &[
            "--config",
            config_path.to_str().unwrap(),
            "render",
            "--topic",
            "orders",
            "--partition",
            "2",
            "--offset",
            "9",
        ],
        temp_dir.path(),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("partition"));
    Ok(())
}
