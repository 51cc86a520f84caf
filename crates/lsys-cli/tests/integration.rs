//! Integration tests for lsys CLI commands.
//!
//! These tests run the actual binary and verify end-to-end behavior.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lsys"))
}

/// Get the path to a grammar in test_assets.
fn asset(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // Go up from lsys-cli to crates
    path.pop(); // Go up from crates to repo root
    path.push("test_assets");
    path.push(name);
    path
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("lsys-test-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

#[test]
fn strings_command_lists_every_iteration() {
    let output = Command::new(binary_path())
        .args(["strings", asset("koch.lsys").to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 5, "Koch grammar precomputes 5 iterations");
    assert_eq!(lines[0], "  0 [1] F");
    assert_eq!(lines[1], "  1 [9] F+F-F-F+F");
    assert!(lines[4].contains("more)"), "Long strings are truncated");
}

#[test]
fn render_command_produces_svg() {
    let output = Command::new(binary_path())
        .args(["render", asset("sierpinski.lsys").to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("<?xml"), "Should have XML declaration");
    assert!(stdout.contains("<svg"), "Should have SVG element");
    assert!(stdout.contains("<polyline"), "Should have polylines");
    assert!(stdout.contains("</svg>"), "Should close SVG element");
}

#[test]
fn render_command_produces_json() {
    let output = Command::new(binary_path())
        .args(["render", asset("koch.lsys").to_str().unwrap(), "-f", "json", "-i", "1"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("\"index\": 1"));
    assert!(stdout.contains("\"symbols\": 9"));
    assert!(stdout.contains("\"transform\""));
    assert!(stdout.contains("\"pipeline\": \"lsys-cli\""));
    assert!(stdout.contains("\"stride\": 8"));
    assert!(stdout.contains("\"x1\""), "Should have x1 coordinate");
    assert!(stdout.contains("\"y2\""), "Should have y2 coordinate");
    // Iteration 1 of the Koch curve draws 5 segments
    assert_eq!(stdout.matches("\"x1\"").count(), 5);
}

#[test]
fn render_command_writes_png() {
    let out = std::env::temp_dir().join(format!("lsys-test-{}-dragon.png", std::process::id()));

    let output = Command::new(binary_path())
        .args([
            "render",
            asset("dragon.lsys").to_str().unwrap(),
            "-f",
            "png",
            "--size",
            "200x100",
            "-o",
            out.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let bytes = std::fs::read(&out).expect("PNG should be written");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let _ = std::fs::remove_file(&out);
}

#[test]
fn render_out_of_range_iteration_fails() {
    let output = Command::new(binary_path())
        .args(["render", asset("koch.lsys").to_str().unwrap(), "-i", "99"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("99"), "Error should name the index: {}", stderr);
}

#[test]
fn stats_reports_early_stop_with_small_buffer() {
    let config = temp_file("small.yaml", "max_buffer_bytes: 4096\n");

    let output = Command::new(binary_path())
        .args([
            "stats",
            asset("koch.lsys").to_str().unwrap(),
            "--json",
            "-c",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"complete\": false"));
    assert!(stdout.contains("\"reached\": 4"));
    assert!(stdout.contains("\"max_bytes\": 4096"));
    assert!(stdout.contains("\"output_chains\""));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stopped precomputing iterations"), "stderr: {}", stderr);
    assert_eq!(stderr.matches("stopped precomputing").count(), 1, "warned once");
    assert!(stderr.contains("reached=4"), "stderr: {}", stderr);
    let _ = std::fs::remove_file(&config);
}

#[test]
fn stats_stops_doubling_grammar_at_symbol_limit() {
    let config = temp_file("symbols.yaml", "max_symbols: 64\n");
    let grammar = temp_file("doubling.lsys", "90\n50\nX\nX XX\n");

    let output = Command::new(binary_path())
        .args([
            "stats",
            grammar.to_str().unwrap(),
            "--json",
            "-c",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    // 1, 2, 4, ... 64 symbols
    assert!(stdout.contains("\"reached\": 7"));
    assert!(stdout.contains("\"complete\": false"));
    assert!(stdout.contains("symbol string too long"));
    let _ = std::fs::remove_file(&config);
    let _ = std::fs::remove_file(&grammar);
}

#[test]
fn stats_table_lists_buffer_usage() {
    let output = Command::new(binary_path())
        .args(["stats", asset("plant.lsys").to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("L-SYSTEM: 6 iterations at 25°"));
    assert!(stdout.contains("Buffer:"));
    assert!(stdout.contains("Target reached"));
}

#[test]
fn grammar_can_come_from_stdin() {
    let mut child = Command::new(binary_path())
        .args(["strings", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"60\n3\nF\nF F+F\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("  2 [7] F+F+F+F"));
}

#[test]
fn malformed_grammar_reports_line() {
    let grammar = temp_file("bad.lsys", "# bad angle\nninety\n3\nF\n");

    let output = Command::new(binary_path())
        .args(["strings", grammar.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {}", stderr);
    let _ = std::fs::remove_file(&grammar);
}

#[test]
fn help_lists_subcommands() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["render", "strings", "stats", "view"] {
        assert!(stdout.contains(command), "Help should list '{}'", command);
    }
}

#[test]
fn example_config_is_valid() {
    let output = Command::new(binary_path())
        .args([
            "strings",
            asset("gosper.lsys").to_str().unwrap(),
            "-c",
            asset("engine.yaml").to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 4);
}
