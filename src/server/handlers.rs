use super::error::ApiError;
use super::AppState;
use crate::error::{BoardlogError, Result};
use crate::logs::{read_log_page, LogPage, LogQuery};
use crate::trace::TraceContext;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Raw query string of `GET /api/logs/`; values are validated by hand so that
/// bad input maps onto the same error body as every other failure.
#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    pub level: Option<String>,
    pub trace_id: Option<String>,
    pub page: Option<String>,
    pub logs_per_page: Option<String>,
}

impl LogParams {
    /// Turn the parameters into a query, applying defaults and limits
    pub fn into_query(self, default_per_page: usize, max_per_page: usize) -> Result<LogQuery> {
        let page = parse_positive("page", self.page.as_deref(), 1)?;
        let logs_per_page = parse_positive(
            "logs_per_page",
            self.logs_per_page.as_deref(),
            default_per_page,
        )?;

        if logs_per_page > max_per_page {
            return Err(BoardlogError::InvalidQuery(format!(
                "logs_per_page cannot exceed {}",
                max_per_page
            )));
        }

        LogQuery::new(
            self.level.as_deref().unwrap_or(""),
            self.trace_id.as_deref().unwrap_or(""),
            page,
            logs_per_page,
        )
    }
}

impl LogParams {
    /// Deserialize the query string of `uri`
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        Query::<LogParams>::try_from_uri(uri)
            .map(|Query(params)| params)
            .map_err(|e| BoardlogError::InvalidQuery(e.body_text()))
    }
}

/// Parse an optional positive integer; absent or blank means `default`
fn parse_positive(name: &str, value: Option<&str>, default: usize) -> Result<usize> {
    let value = match value.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(v) => v,
    };

    match value.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(BoardlogError::InvalidQuery(format!(
            "{} must be a positive integer, got {:?}",
            name, value
        ))),
    }
}

/// GET /api/logs/: one page of the log file, admins only
///
/// The query string is taken raw and only deserialized after the admin check.
pub async fn get_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<TraceContext>,
    headers: HeaderMap,
    uri: Uri,
) -> std::result::Result<Json<LogPage>, ApiError> {
    state
        .admin
        .authorize(&headers)
        .map_err(|e| ApiError::new(e, &ctx.trace_id))?;

    let query = LogParams::from_uri(&uri)
        .and_then(|params| {
            params.into_query(state.default_logs_per_page, state.max_logs_per_page)
        })
        .map_err(|e| ApiError::new(e, &ctx.trace_id))?;

    debug!(
        trace_id = %ctx.trace_id,
        level = ?query.level,
        filter_trace = ?query.trace_id,
        page = query.page,
        logs_per_page = query.logs_per_page,
        "log query"
    );

    let page = read_log_page(&state.log_file, &query, state.total_pages_rule)
        .await
        .map_err(|e| ApiError::new(e, &ctx.trace_id))?;

    Ok(Json(page))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
