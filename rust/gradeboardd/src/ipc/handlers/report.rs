use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;

fn handle_report_prompt(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(year) = state.data.current_year() else {
        return err(&req.id, "no_selection", "no year selected", None);
    };
    ok(
        &req.id,
        json!({
            "yearId": year.id,
            "prompt": report::build_prompt(&year.sub_periods, &year.name),
        }),
    )
}

fn handle_report_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(year) = state.data.current_year() else {
        return err(&req.id, "no_selection", "no year selected", None);
    };
    if year.sub_periods.is_empty() {
        return err(&req.id, "bad_params", "year has no sub-periods", None);
    }
    let html = match state.reporter.as_ref() {
        Some(client) => client.generate(&year.sub_periods, &year.name),
        None => report::FAILURE_PLACEHOLDER.to_string(),
    };
    ok(&req.id, json!({ "yearId": year.id, "html": html }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.prompt" => Some(handle_report_prompt(state, req)),
        "report.generate" => Some(handle_report_generate(state, req)),
        _ => None,
    }
}
