use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn chunkpress(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chunkpress"))
        .args(args)
        .output()
        .expect("spawn chunkpress")
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("utf-8 temp path")
}

/// Repetitive text followed by a noisy tail, so some chunks compress and some don't.
fn sample_payload() -> Vec<u8> {
    let mut data: Vec<u8> = b"backup payload line\n"
        .iter()
        .copied()
        .cycle()
        .take(40_000)
        .collect();
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    data.extend((0..20_000).map(|_| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state as u8
    }));
    data
}

#[test]
fn compress_then_restore_round_trips() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let archive = dir.path().join("input.chpk");
    let restored = dir.path().join("restored.bin");
    let data = sample_payload();
    std::fs::write(&input, &data).unwrap();

    for codec in ["deflate", "rle", "zstd", "lz4"] {
        let out = chunkpress(&[
            "compress",
            path_str(&input),
            path_str(&archive),
            "--codec",
            codec,
            "--chunk-size",
            "8192",
        ]);
        assert!(out.status.success(), "{codec}: {}", String::from_utf8_lossy(&out.stderr));

        let out = chunkpress(&["restore", path_str(&archive), path_str(&restored)]);
        assert!(out.status.success(), "{codec}: {}", String::from_utf8_lossy(&out.stderr));
        assert_eq!(std::fs::read(&restored).unwrap(), data, "{codec}");
    }
}

#[test]
fn inspect_json_reports_index() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let archive = dir.path().join("input.chpk");
    std::fs::write(&input, sample_payload()).unwrap();

    let out = chunkpress(&[
        "compress",
        path_str(&input),
        path_str(&archive),
        "--chunk-size",
        "10000",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = chunkpress(&["inspect", path_str(&archive), "--chunks", "--json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["chunk_count"], 6);
    assert_eq!(doc["codec_id"], 1);
    assert_eq!(doc["raw_size"], 60_000);
    let chunks = doc["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 6);
    assert_eq!(chunks[0]["compressed"], true);
    assert_eq!(chunks[5]["compressed"], false);
}

#[test]
fn probe_json_reports_totals() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, sample_payload()).unwrap();

    let out = chunkpress(&[
        "probe",
        path_str(&input),
        "--chunk-size",
        "10000",
        "--chunks",
        "--json",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["codec"], "deflate");
    assert_eq!(doc["totals"]["operations"], 6);
    assert_eq!(doc["totals"]["original_bytes"], 60_000);
    let chunks = doc["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 6);
    assert_eq!(chunks[0]["compression_used"], true);
    assert_eq!(chunks[5]["compression_used"], false);
}

#[test]
fn read_chunk_writes_raw_bytes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let archive = dir.path().join("input.chpk");
    let chunk_out = dir.path().join("chunk1.bin");
    let data = sample_payload();
    std::fs::write(&input, &data).unwrap();

    let out = chunkpress(&[
        "compress",
        path_str(&input),
        path_str(&archive),
        "--chunk-size",
        "10000",
    ]);
    assert!(out.status.success());

    let out = chunkpress(&[
        "read-chunk",
        path_str(&archive),
        "--index",
        "1",
        "--output",
        path_str(&chunk_out),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(std::fs::read(&chunk_out).unwrap(), &data[10_000..20_000]);

    let out = chunkpress(&["read-chunk", path_str(&archive), "--index", "99"]);
    assert!(!out.status.success());
}

#[test]
fn config_file_is_applied_and_validated() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    let archive = dir.path().join("input.chpk");
    let config = dir.path().join("chunkpress.json");
    std::fs::write(&input, sample_payload()).unwrap();

    std::fs::write(&config, r#"{ "chunk_size": 20000, "codec": { "kind": "rle" } }"#).unwrap();
    let out = chunkpress(&[
        "compress",
        path_str(&input),
        path_str(&archive),
        "--config",
        path_str(&config),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let out = chunkpress(&["inspect", path_str(&archive), "--json"]);
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(doc["codec_id"], 2);
    assert_eq!(doc["chunk_count"], 3);

    std::fs::write(&config, r#"{ "codec": { "kind": "deflate", "level": 42 } }"#).unwrap();
    let out = chunkpress(&[
        "compress",
        path_str(&input),
        path_str(&archive),
        "--config",
        path_str(&config),
    ]);
    assert!(!out.status.success());
}
