use crate::calc::TrendMemory;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::AppData;
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "aiConfigured": state.reporter.as_ref().map(|r| r.is_configured()).unwrap_or(false),
            "trackedSubjects": state.previous_averages.len()
        }),
    )
}

/// Open (or create) a workspace and load its tree. Shared with startup.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    let data = db::load_app_data(&conn)?;
    tracing::info!(
        workspace = %path.display(),
        students = data.students.len(),
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    state.data = data;
    state.previous_averages = TrendMemory::default();
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "studentCount": state.data.students.len()
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_app_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    match serde_json::to_value(&state.data) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
    }
}

fn handle_app_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = db::clear_app_data(conn) {
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    tracing::info!("app data reset");
    state.data = AppData::default();
    state.previous_averages = TrendMemory::default();
    ok(&req.id, json!({ "reset": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "app.get" => Some(handle_app_get(state, req)),
        "app.reset" => Some(handle_app_reset(state, req)),
        _ => None,
    }
}
