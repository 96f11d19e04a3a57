mod test_support;

use serde_json::json;
use test_support::{error_code, request, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradeboard-router-smoke");
    let bundle_out = workspace.join("smoke-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["aiConfigured"], false);

    let early = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "Too Early" }),
    );
    assert_eq!(error_code(&early), Some("no_workspace"));

    let calls = [
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("app.get", json!({})),
        ("selection.set", json!({ "studentId": "missing" })),
        ("students.create", json!({ "name": "Smoke" })),
        ("students.rename", json!({ "studentId": "missing", "name": "x" })),
        ("years.create", json!({ "name": "2025/2026" })),
        ("years.rename", json!({ "yearId": "missing", "name": "x" })),
        ("subPeriods.create", json!({ "name": "T1" })),
        ("subPeriods.rename", json!({ "subPeriodId": "missing", "name": "x" })),
        ("subjects.create", json!({})),
        ("subjects.update", json!({ "subjectId": "missing" })),
        ("grades.create", json!({ "subjectId": "missing" })),
        ("grades.update", json!({ "subjectId": "missing", "gradeId": "missing" })),
        ("grades.delete", json!({ "subjectId": "missing", "gradeId": "missing" })),
        ("subjects.delete", json!({ "subjectId": "missing" })),
        ("averages.get", json!({})),
        ("report.prompt", json!({})),
        ("report.generate", json!({})),
        ("backup.export", json!({ "outPath": bundle_out.to_string_lossy() })),
        ("backup.import", json!({ "inPath": bundle_out.to_string_lossy() })),
        ("subPeriods.delete", json!({ "subPeriodId": "missing" })),
        ("years.delete", json!({ "yearId": "missing" })),
        ("students.delete", json!({ "studentId": "missing" })),
        ("app.reset", json!({})),
    ];
    for (i, (method, params)) in calls.iter().enumerate() {
        let id = format!("c{i}");
        let resp = request(&mut stdin, &mut reader, &id, method, params.clone());
        assert_ne!(
            error_code(&resp),
            Some("not_implemented"),
            "unexpected unknown method for {}",
            method
        );
    }

    let unknown = request(&mut stdin, &mut reader, "u", "grades.frobnicate", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bad_json_line_gets_an_error_without_id() {
    use std::io::{BufRead, Write};

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "bad_json");

    let health = request(&mut stdin, &mut reader, "after", "health", json!({}));
    assert_eq!(health["ok"], true);

    drop(stdin);
    let _ = child.wait();
}
