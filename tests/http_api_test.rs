use axum::body::Body;
use axum::http::{Request, StatusCode};
use boardlog::auth::AdminTokens;
use boardlog::logs::TotalPagesRule;
use boardlog::server::{build_router, AppState, AppStateInner};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "admin-secret";

fn state(log_file: &Path, rule: TotalPagesRule) -> AppState {
    AppState::new(AppStateInner {
        log_file: log_file.to_path_buf(),
        admin: AdminTokens::new([TOKEN]),
        default_logs_per_page: 200,
        max_logs_per_page: 1000,
        total_pages_rule: rule,
        request_timeout: Duration::from_secs(5),
    })
}

fn write_lines(dir: &TempDir, lines: &[String]) -> PathBuf {
    let path = dir.path().join("debug.log");
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn line(level: &str, trace: &str, n: usize) -> String {
    format!(
        "{} 2024-01-01 10:00:{:02},000 {} views 10 20 line {}",
        level, n, trace, n
    )
}

async fn get(
    state: AppState,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    let response = build_router(state)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let trace_header = response
        .headers()
        .get("x-trace-id")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, trace_header)
}

#[tokio::test]
async fn test_level_filter_with_pagination() {
    let temp_dir = TempDir::new().unwrap();
    let lines: Vec<String> = (1..=5)
        .map(|n| line(if n % 2 == 1 { "INFO" } else { "ERROR" }, "t", n))
        .collect();
    let path = write_lines(&temp_dir, &lines);

    let (status, body, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?level=INFO&page=1&logs_per_page=2",
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([lines[0], lines[2]]));
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 2);
}

#[tokio::test]
async fn test_trace_filter() {
    let temp_dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..10)
        .map(|n| line("INFO", if n == 2 || n == 8 { "abc123" } else { "other" }, n))
        .collect();
    let path = write_lines(&temp_dir, &lines);

    let (status, body, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?trace_id=abc123",
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([lines[2], lines[8]]));
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_exact_multiple_under_both_rules() {
    let temp_dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..4).map(|n| line("INFO", "t", n)).collect();
    let path = write_lines(&temp_dir, &lines);

    let uri = "/api/logs/?logs_per_page=2";
    let (_, exact, _) = get(state(&path, TotalPagesRule::Exact), uri, Some(TOKEN)).await;
    let (_, legacy, _) = get(state(&path, TotalPagesRule::Legacy), uri, Some(TOKEN)).await;

    assert_eq!(exact["total_pages"], 2);
    assert_eq!(legacy["total_pages"], 3);
}

#[tokio::test]
async fn test_missing_file_returns_empty_page() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.log");

    let (status, body, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs",
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([]));
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_page_out_of_range_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_lines(&temp_dir, &[line("INFO", "t", 1)]);

    let (status, body, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?page=7",
        Some(TOKEN),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([]));
    assert_eq!(body["page"], 7);
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_requires_admin_token() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_lines(&temp_dir, &[line("INFO", "t", 1)]);

    let (status, body, trace) =
        get(state(&path, TotalPagesRule::Exact), "/api/logs/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["trace_id"].as_str(), trace.as_deref());

    let (status, _, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/",
        Some("guess"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_authorization_is_checked_before_query_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("debug.log");

    let (status, _, _) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?page=zero",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_authorization_is_checked_before_query_deserialization() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("debug.log");

    let (status, body, trace) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?page=1&page=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["trace_id"].as_str(), trace.as_deref());
}

#[tokio::test]
async fn test_undeserializable_query_is_json_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_lines(&temp_dir, &[]);

    let (status, body, trace) = get(
        state(&path, TotalPagesRule::Exact),
        "/api/logs/?page=1&page=2",
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(body["trace_id"].as_str(), trace.as_deref());
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_lines(&temp_dir, &[]);

    for uri in [
        "/api/logs/?page=0",
        "/api/logs/?page=abc",
        "/api/logs/?logs_per_page=-5",
        "/api/logs/?logs_per_page=5000",
        "/api/logs/?level=LOUD",
    ] {
        let (status, body, _) =
            get(state(&path, TotalPagesRule::Exact), uri, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_trace_id_header_is_echoed() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_lines(&temp_dir, &[]);

    let request = Request::builder()
        .uri("/health")
        .header("x-trace-id", "client-trace-1")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state(&path, TotalPagesRule::Exact))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "client-trace-1"
    );
}

#[tokio::test]
async fn test_health() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("debug.log");

    let (status, body, trace) = get(state(&path, TotalPagesRule::Exact), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(trace.map(|t| t.len()), Some(32));
}
