use crate::calc::{self, average_band, format_average};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Pure read: recomputes everything from the tree and the stored snapshot.
fn handle_averages_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let report = calc::compute_for_selection(&state.data, &state.previous_averages);

    let subjects: Vec<serde_json::Value> = report
        .subjects
        .iter()
        .map(|r| {
            json!({
                "subjectId": r.subject_id,
                "average": r.average,
                "display": format_average(r.average),
                "band": average_band(r.average),
                "trend": r.trend,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "subjects": subjects,
            "subPeriod": {
                "average": report.sub_period,
                "display": format_average(report.sub_period),
            },
            "year": {
                "average": report.year,
                "display": format_average(report.year),
            },
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "averages.get" => Some(handle_averages_get(state, req)),
        _ => None,
    }
}
