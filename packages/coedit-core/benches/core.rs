use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use coedit_core::{generate_delta, AuthorId, LogicalClock, RoomId, VersionGraph};

const CI_CONFIG: &[(u64, u64)] = &[(100, 5), (1_000, 1)];

const LOCAL_CONFIG: &[(u64, u64)] = &[(10, 1), (100, 1), (1_000, 1), (5_000, 1)];

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    implementation: &'static str,
    workload: String,
    timestamp: String,
    total_ops: u64,
    duration_ms: f64,
    ops_per_sec: f64,
    extra: Extra,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Extra {
    count: u64,
    final_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterations: Option<u64>,
}

fn is_ci() -> bool {
    env::var("CI").map(|v| v == "true").unwrap_or(false)
}

/// Type `count` words one edit at a time, then rebuild the final text from history.
fn run_benchmark(count: u64) -> (f64, usize) {
    let mut graph = VersionGraph::new(RoomId::from("bench"), LogicalClock::default());
    let author = AuthorId::from("bench");

    let start = Instant::now();
    let mut text = String::new();
    let mut head = None;
    for i in 0..count {
        let mut next = text.clone();
        next.insert_str(next.len() / 2, &format!("w{i} "));
        let ops = generate_delta(&text, &next);
        head = Some(graph.commit(head.as_ref(), author.clone(), ops).unwrap());
        text = next;
    }
    let rebuilt = head.map(|id| graph.reconstruct(&id).unwrap()).unwrap_or_default();
    assert_eq!(rebuilt, text);
    (start.elapsed().as_secs_f64() * 1000.0, rebuilt.chars().count())
}

fn main() {
    let config = if is_ci() { CI_CONFIG } else { LOCAL_CONFIG };

    let mut out_dir: Option<PathBuf> = None;
    let mut custom_config: Option<Vec<(u64, u64)>> = None;
    for arg in env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--count=") {
            let count = val.parse().unwrap_or(500);
            custom_config = Some(vec![(count, 1)]);
        } else if let Some(val) = arg.strip_prefix("--out-dir=") {
            out_dir = Some(PathBuf::from(val));
        }
    }

    let config = custom_config.as_deref().unwrap_or(config);
    let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("benchmarks/core"));
    fs::create_dir_all(&out_dir).expect("mkdirs");

    for &(count, iterations) in config {
        let mut durations = Vec::new();
        let mut final_len = 0;
        for _ in 0..iterations {
            let (duration, len) = run_benchmark(count);
            durations.push(duration);
            final_len = len;
        }
        let duration_ms = durations.iter().sum::<f64>() / durations.len() as f64;

        let workload = format!("typing-{count}");
        let output = Output {
            implementation: "coedit-core",
            workload: workload.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_ops: count,
            duration_ms,
            ops_per_sec: if duration_ms > 0.0 {
                count as f64 / duration_ms * 1000.0
            } else {
                f64::INFINITY
            },
            extra: Extra {
                count,
                final_len,
                iterations: (iterations > 1).then_some(iterations),
            },
        };

        let json = serde_json::to_string_pretty(&output).expect("serialize");
        fs::write(out_dir.join(format!("memory-{workload}.json")), &json).expect("write output");
        println!("{json}");
    }
}
