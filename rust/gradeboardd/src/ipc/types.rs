use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::calc::TrendMemory;
use crate::model::AppData;
use crate::report::ReportClient;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub data: AppData,
    /// Subject averages as they stood before the latest edit.
    pub previous_averages: TrendMemory,
    pub reporter: Option<ReportClient>,
}

impl AppState {
    pub fn new(reporter: Option<ReportClient>) -> Self {
        Self {
            workspace: None,
            db: None,
            data: AppData::default(),
            previous_averages: TrendMemory::default(),
            reporter,
        }
    }
}
