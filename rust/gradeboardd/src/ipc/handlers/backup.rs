use crate::backup;
use crate::calc::TrendMemory;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = req
        .params
        .get("outPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    match backup::export_bundle(&state.data, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "sha256": summary.sha256,
            }),
        ),
        Err(e) => err(&req.id, "io_failed", format!("{e:?}"), None),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(in_path) = req
        .params
        .get("inPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };

    let summary = match backup::import_bundle(&in_path) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "import_failed", format!("{e:?}"), None),
    };
    if let Err(e) = db::save_app_data(conn, &summary.data) {
        return err(&req.id, "db_write_failed", e.to_string(), None);
    }
    tracing::info!(
        path = %in_path.display(),
        format = %summary.bundle_format_detected,
        students = summary.data.students.len(),
        "backup imported"
    );
    state.previous_averages = TrendMemory::capture(&state.data);
    state.data = summary.data;
    ok(
        &req.id,
        json!({
            "bundleFormatDetected": summary.bundle_format_detected,
            "studentCount": state.data.students.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
