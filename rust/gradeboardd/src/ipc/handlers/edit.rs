use crate::calc::TrendMemory;
use crate::db;
use crate::ipc::error::{err, ok, tree_err};
use crate::ipc::params::{optional_str, parse_number, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::AppData;
use crate::tree::{self, GradePatch, SubjectPatch, TreeResult, FALLBACK_GRADE_COEFFICIENT};
use serde_json::json;

/// How an accepted edit is folded into the daemon state.
#[derive(Clone, Copy, PartialEq)]
enum Cycle {
    /// The tree changed: snapshot the old averages for trends.
    Edit,
    /// Only the selection moved; trend memory is kept.
    Select,
}

fn persist(state: &AppState, data: &AppData) -> anyhow::Result<()> {
    match state.db.as_ref() {
        Some(conn) => db::save_app_data(conn, data),
        None => Ok(()),
    }
}

fn apply<F>(state: &mut AppState, req: &Request, cycle: Cycle, key: &str, op: F) -> serde_json::Value
where
    F: FnOnce(AppData) -> TreeResult,
{
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let (next, id) = match op(state.data.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(method = %req.method, error = %e, "edit rejected");
            return tree_err(&req.id, &e);
        }
    };
    if let Err(e) = persist(state, &next) {
        tracing::error!(method = %req.method, error = ?e, "failed to persist app data");
        return err(&req.id, "db_write_failed", e.to_string(), None);
    }
    if cycle == Cycle::Edit {
        state.previous_averages = TrendMemory::capture(&state.data);
    }
    state.data = next;
    ok(
        &req.id,
        json!({
            key: id,
            "selection": {
                "studentId": state.data.selected_student_id,
                "yearId": state.data.selected_year_id,
                "subPeriodId": state.data.selected_sub_period_id,
            }
        }),
    )
}

fn subject_patch(req: &Request) -> SubjectPatch {
    SubjectPatch {
        name: optional_str(req, "name").map(str::to_string),
        coefficient: parse_number(req.params.get("coefficient"), 0.0),
    }
}

/// A zero grade coefficient is treated like an unparsable one.
fn grade_patch(req: &Request) -> GradePatch {
    GradePatch {
        value: parse_number(req.params.get("value"), 0.0),
        coefficient: parse_number(req.params.get("coefficient"), FALLBACK_GRADE_COEFFICIENT)
            .map(|c| if c == 0.0 { FALLBACK_GRADE_COEFFICIENT } else { c }),
    }
}

macro_rules! param {
    ($req:expr, $key:expr) => {
        match required_str($req, $key) {
            Ok(v) => v.to_string(),
            Err(resp) => return resp,
        }
    };
}

fn handle_students(state: &mut AppState, req: &Request, action: &str) -> serde_json::Value {
    match action {
        "create" => {
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "studentId", |d| {
                tree::add_student(d, &name)
            })
        }
        "rename" => {
            let id = param!(req, "studentId");
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "studentId", |d| {
                tree::rename_student(d, &id, &name)
            })
        }
        _ => {
            let id = param!(req, "studentId");
            apply(state, req, Cycle::Edit, "studentId", |d| {
                tree::delete_student(d, &id)
            })
        }
    }
}

fn handle_years(state: &mut AppState, req: &Request, action: &str) -> serde_json::Value {
    match action {
        "create" => {
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "yearId", |d| tree::add_year(d, &name))
        }
        "rename" => {
            let id = param!(req, "yearId");
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "yearId", |d| {
                tree::rename_year(d, &id, &name)
            })
        }
        _ => {
            let id = param!(req, "yearId");
            apply(state, req, Cycle::Edit, "yearId", |d| tree::delete_year(d, &id))
        }
    }
}

fn handle_sub_periods(state: &mut AppState, req: &Request, action: &str) -> serde_json::Value {
    match action {
        "create" => {
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "subPeriodId", |d| {
                tree::add_sub_period(d, &name)
            })
        }
        "rename" => {
            let id = param!(req, "subPeriodId");
            let name = param!(req, "name");
            apply(state, req, Cycle::Edit, "subPeriodId", |d| {
                tree::rename_sub_period(d, &id, &name)
            })
        }
        _ => {
            let id = param!(req, "subPeriodId");
            apply(state, req, Cycle::Edit, "subPeriodId", |d| {
                tree::delete_sub_period(d, &id)
            })
        }
    }
}

fn handle_subjects(state: &mut AppState, req: &Request, action: &str) -> serde_json::Value {
    match action {
        "create" => {
            let patch = subject_patch(req);
            apply(state, req, Cycle::Edit, "subjectId", |d| {
                tree::add_subject(d, patch)
            })
        }
        "update" => {
            let id = param!(req, "subjectId");
            let patch = subject_patch(req);
            apply(state, req, Cycle::Edit, "subjectId", |d| {
                tree::update_subject(d, &id, patch)
            })
        }
        _ => {
            let id = param!(req, "subjectId");
            apply(state, req, Cycle::Edit, "subjectId", |d| {
                tree::delete_subject(d, &id)
            })
        }
    }
}

fn handle_grades(state: &mut AppState, req: &Request, action: &str) -> serde_json::Value {
    let subject = param!(req, "subjectId");
    match action {
        "create" => {
            let patch = grade_patch(req);
            apply(state, req, Cycle::Edit, "gradeId", |d| {
                tree::add_grade(d, &subject, patch)
            })
        }
        "update" => {
            let id = param!(req, "gradeId");
            let patch = grade_patch(req);
            apply(state, req, Cycle::Edit, "gradeId", |d| {
                tree::update_grade(d, &subject, &id, patch)
            })
        }
        _ => {
            let id = param!(req, "gradeId");
            apply(state, req, Cycle::Edit, "gradeId", |d| {
                tree::delete_grade(d, &subject, &id)
            })
        }
    }
}

/// Exactly one of studentId / yearId / subPeriodId.
fn handle_selection_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(id) = optional_str(req, "studentId").map(str::to_string) {
        return apply(state, req, Cycle::Select, "studentId", |d| {
            tree::select_student(d, &id)
        });
    }
    if let Some(id) = optional_str(req, "yearId").map(str::to_string) {
        return apply(state, req, Cycle::Select, "yearId", |d| {
            tree::select_year(d, &id)
        });
    }
    if let Some(id) = optional_str(req, "subPeriodId").map(str::to_string) {
        return apply(state, req, Cycle::Select, "subPeriodId", |d| {
            tree::select_sub_period(d, &id)
        });
    }
    err(
        &req.id,
        "bad_params",
        "expected studentId, yearId or subPeriodId",
        None,
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if req.method == "selection.set" {
        return Some(handle_selection_set(state, req));
    }
    let (family, action) = req.method.split_once('.')?;
    let known = match family {
        "students" | "years" | "subPeriods" => matches!(action, "create" | "rename" | "delete"),
        "subjects" | "grades" => matches!(action, "create" | "update" | "delete"),
        _ => false,
    };
    if !known {
        return None;
    }
    Some(match family {
        "students" => handle_students(state, req, action),
        "years" => handle_years(state, req, action),
        "subPeriods" => handle_sub_periods(state, req, action),
        "subjects" => handle_subjects(state, req, action),
        _ => handle_grades(state, req, action),
    })
}
