use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub const NO_DATA_NOTICE: &str = "Nenhum dado encontrado com os filtros selecionados.";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read spreadsheet {path:?}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unsupported data file format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("data file {0:?} has no header row")]
    MissingHeader(PathBuf),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column '{0}' must contain only numbers")]
    NonNumericColumn(String),

    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        found: usize,
        expected: usize,
    },

    #[error("{}", NO_DATA_NOTICE)]
    NoData,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::NoData => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
