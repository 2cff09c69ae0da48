use rechunk::aggregate::FileStatus;
use rechunk::archive::ArchiveOutcome;
use rechunk::pipeline::{run, RepartitionOptions};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn drugs(prefix: &str, n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({
            "drugName": format!("{prefix}-{i}"),
            "setId": format!("{prefix}{i:04}"),
            "label": { "genericName": format!("generic {prefix} {i}"), "warnings": ["ü", "→"] },
        }))
        .collect()
}

fn double_encoded(records: &[Value]) -> String {
    serde_json::to_string(&serde_json::to_string(records).unwrap()).unwrap()
}

fn read_shard(dir: &Path, name: &str) -> Vec<Value> {
    serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
}

fn options(dir: &TempDir, last: u32, shards: usize) -> RepartitionOptions {
    RepartitionOptions {
        data_dir: dir.path().to_owned(),
        last_input: last,
        target_shards: shards,
        ..RepartitionOptions::default()
    }
}

#[test]
fn test_twelve_double_encoded_records_into_five_shards() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b, c) = (drugs("a", 4), drugs("b", 5), drugs("c", 3));
    fs::write(dir.path().join("chunk_1.json"), double_encoded(&a)).unwrap();
    fs::write(dir.path().join("chunk_2.json"), double_encoded(&b)).unwrap();
    fs::write(dir.path().join("chunk_3.json"), double_encoded(&c)).unwrap();

    let report = run(&options(&dir, 3, 5)).unwrap();
    assert_eq!(report.total_records, 12);
    assert_eq!(report.shard_size, Some(3));
    assert_eq!(report.shards.len(), 4);
    assert_eq!(report.shards_written(), 4);
    assert!(!dir.path().join("chunk_005.json").exists());

    let expected: Vec<Value> = a.into_iter().chain(b).chain(c).collect();
    let mut joined = Vec::new();
    for i in 1..=4 {
        let shard = read_shard(dir.path(), &format!("chunk_{i:03}.json"));
        assert_eq!(shard.len(), 3);
        joined.extend(shard);
    }
    assert_eq!(joined, expected);

    // Inputs moved, not copied.
    let backup = dir.path().join("original_chunks");
    for i in 1..=3 {
        assert!(!dir.path().join(format!("chunk_{i}.json")).exists());
        assert!(backup.join(format!("chunk_{i}.json")).exists());
    }
    assert_eq!(report.archived(), 3);
}

#[test]
fn test_malformed_file_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("chunk_1.json"), serde_json::to_string(&drugs("ok", 2)).unwrap()).unwrap();
    fs::write(
        dir.path().join("chunk_2.json"),
        r#"[{"drugName": "Lost-1", "label": {}}, {"drugName": "Lost-2", "lab"#,
    )
    .unwrap();

    let report = run(&options(&dir, 2, 80)).unwrap();
    assert_eq!(report.total_records, 2);
    assert_eq!(report.shards.len(), 2);

    match &report.files[1].status {
        FileStatus::Failed { reason, partial: Some(p) } => {
            assert!(reason.starts_with("Unparseable"));
            assert_eq!(p.names, ["Lost-1", "Lost-2"]);
            assert!(p.tail.ends_with(r#""lab"#));
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let records = drugs("x", 7);
    fs::write(dir.path().join("chunk_1.json"), serde_json::to_string(&records).unwrap()).unwrap();

    let first = run(&options(&dir, 1, 3)).unwrap();
    assert_eq!(first.shards_written(), 3);

    // Inputs are gone, so the second run recovers nothing and stops cleanly.
    let second = run(&options(&dir, 1, 3)).unwrap();
    assert_eq!(second.total_records, 0);
    assert!(second.shards.is_empty());
    assert!(second.archive.is_empty());

    let backup = dir.path().join("original_chunks");
    assert_eq!(fs::read_dir(&backup).unwrap().count(), 1);
    let joined: Vec<Value> = (1..=3)
        .flat_map(|i| read_shard(dir.path(), &format!("chunk_{i:03}.json")))
        .collect();
    assert_eq!(joined, records);
}

#[test]
fn test_interrupted_backup_is_completed_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let backup = dir.path().join("original_chunks");
    fs::create_dir(&backup).unwrap();

    // A prior run already moved chunk_1 but died before removing the copy.
    let original = serde_json::to_string(&drugs("p", 2)).unwrap();
    fs::write(backup.join("chunk_1.json"), &original).unwrap();
    fs::write(dir.path().join("chunk_1.json"), &original).unwrap();
    fs::write(dir.path().join("chunk_2.json"), serde_json::to_string(&drugs("q", 1)).unwrap()).unwrap();

    let report = run(&options(&dir, 2, 80)).unwrap();
    assert!(matches!(report.archive[0], ArchiveOutcome::Discarded { .. }));
    assert!(matches!(report.archive[1], ArchiveOutcome::Moved { .. }));
    assert_eq!(fs::read_to_string(backup.join("chunk_1.json")).unwrap(), original);
    assert_eq!(fs::read_dir(&backup).unwrap().count(), 2);
    assert!(!dir.path().join("chunk_1.json").exists());
}

#[test]
fn test_shards_keep_unicode_and_key_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("chunk_1.json"), r#"[{"zeta": "ß", "alpha": {"b": 1, "a": 2}}]"#).unwrap();

    run(&options(&dir, 1, 80)).unwrap();
    let text = fs::read_to_string(dir.path().join("chunk_001.json")).unwrap();
    assert_eq!(
        text,
        "[\n  {\n    \"zeta\": \"ß\",\n    \"alpha\": {\n      \"b\": 1,\n      \"a\": 2\n    }\n  }\n]"
    );
}

#[test]
fn test_no_archive_leaves_inputs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("chunk_1.json"), "[1, 2]").unwrap();

    let opts = RepartitionOptions { archive_inputs: false, ..options(&dir, 1, 1) };
    let report = run(&opts).unwrap();
    assert_eq!(report.archive_skipped, Some("archiving disabled"));
    assert!(dir.path().join("chunk_1.json").exists());
    assert_eq!(read_shard(dir.path(), "chunk_001.json"), vec![json!(1), json!(2)]);
}
