use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "cwnd-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn path_arg(p: &Path) -> &str {
    p.to_str().expect("utf8 path")
}

#[test]
fn congestion_writes_cwnd_trace_and_summary() {
    let dir = unique_temp_dir("cwnd");
    let cwnd = dir.join("congestion.cwnd");
    let drops = dir.join("congestion.drops");
    let summary = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_congestion"))
        .args([
            "--packets",
            "100",
            "--until-ms",
            "5000",
            "--stop-ms",
            "5000",
            "--cwnd-trace",
            path_arg(&cwnd),
            "--drop-trace",
            path_arg(&drops),
            "--summary-json",
            path_arg(&summary),
        ])
        .output()
        .expect("run congestion");
    assert!(
        output.status.success(),
        "congestion failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("packets_sent=100"), "stdout={stdout}");

    let trace = fs::read_to_string(&cwnd).expect("read cwnd trace");
    let lines: Vec<&str> = trace.lines().collect();
    assert!(!lines.is_empty(), "cwnd trace should not be empty");
    for line in &lines {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 3, "bad cwnd line: {line:?}");
        let t: f64 = fields[0].parse().expect("time");
        assert!((1.0..=5.0).contains(&t), "time out of range: {line:?}");
        fields[1].parse::<u64>().expect("old cwnd");
        fields[2].parse::<u64>().expect("new cwnd");
    }

    let raw = fs::read_to_string(&summary).expect("read summary");
    let v: Value = serde_json::from_str(&raw).expect("parse summary");
    assert_eq!(v.get("packets_sent").and_then(Value::as_u64), Some(100));
    assert_eq!(
        v.get("cwnd_changes").and_then(Value::as_u64),
        Some(lines.len() as u64)
    );
    let rx_drops = v.get("rx_drops").and_then(Value::as_u64).expect("rx_drops");
    let drop_lines = fs::read_to_string(&drops).expect("read drop trace").lines().count();
    assert_eq!(drop_lines as u64, rx_drops);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn congestion_runs_scenario_file() {
    let dir = unique_temp_dir("scenario");
    let scenario = dir.join("scenario.json");
    fs::write(
        &scenario,
        r#"{ "packets": 10, "error_rate": 0.0, "ipv6": true, "until_ms": 2000 }"#,
    )
    .expect("write scenario");
    let summary = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_congestion"))
        .args([
            "--scenario",
            path_arg(&scenario),
            "--cwnd-trace",
            path_arg(&dir.join("c.cwnd")),
            "--drop-trace",
            path_arg(&dir.join("c.drops")),
            "--summary-json",
            path_arg(&summary),
        ])
        .output()
        .expect("run congestion");
    assert!(
        output.status.success(),
        "congestion failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: Value =
        serde_json::from_str(&fs::read_to_string(&summary).expect("read summary")).expect("json");
    assert_eq!(v.get("sink_rx_bytes").and_then(Value::as_u64), Some(10_400));
    assert_eq!(v.get("rx_drops").and_then(Value::as_u64), Some(0));
    assert_eq!(v.get("final_time_s").and_then(Value::as_f64), Some(2.0));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn congestion_rejects_bad_arguments() {
    let bad_rate = Command::new(env!("CARGO_BIN_EXE_congestion"))
        .args(["--data-rate", "fast"])
        .output()
        .expect("run congestion");
    assert!(!bad_rate.status.success());

    let dir = unique_temp_dir("invalid");
    let output = Command::new(env!("CARGO_BIN_EXE_congestion"))
        .args([
            "--packets",
            "0",
            "--cwnd-trace",
            path_arg(&dir.join("c.cwnd")),
            "--drop-trace",
            path_arg(&dir.join("c.drops")),
        ])
        .output()
        .expect("run congestion");
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("packets"),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let _ = fs::remove_dir_all(&dir);
}
