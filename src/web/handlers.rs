//! HTTP request handlers

use super::state::AppState;
use crate::error::ApiError;
use crate::query::{ArticleQuery, RecordFilter};
use crate::restart::RestartOutcome;
use crate::store::Record;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Query parameters for `/api/data`
#[derive(Debug, Default, Deserialize)]
pub struct DataParams {
    /// Lot identifiers (comma-separated)
    #[serde(rename = "lotId")]
    pub lot_id: Option<String>,
    /// First shift day, `YYYY-MM-DD`
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    /// Last shift day, `YYYY-MM-DD`
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// Query parameters for `/api/unique-article-numbers`
#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
}

/// Query parameters for `/api/data-by-article`
#[derive(Debug, Default, Deserialize)]
pub struct ArticleParams {
    /// Article numbers (comma-separated)
    pub articles: Option<String>,
}

/// Records filtered by lot list or shift date range
pub async fn data(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let filter = RecordFilter::from_params(
        params.lot_id.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    );
    if filter.is_none() {
        return Ok(Json(Vec::new()));
    }

    let rows = state
        .store
        .fetch(&filter)
        .await
        .map_err(ApiError::query_failed)?;
    debug!("/api/data returned {} row(s)", rows.len());
    Ok(Json(rows))
}

/// Distinct article numbers containing `q`
pub async fn unique_article_numbers(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let q = params.q.unwrap_or_default();
    let suggestions = state
        .autocomplete
        .suggest(&q)
        .await
        .map_err(ApiError::suggestions_failed)?;
    Ok(Json(suggestions.to_vec()))
}

/// Records whose article number matches one of `articles`
pub async fn data_by_article(
    State(state): State<AppState>,
    Query(params): Query<ArticleParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let query = ArticleQuery::parse(params.articles.as_deref().unwrap_or_default());
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let rows = state
        .store
        .fetch_by_articles(&query)
        .await
        .map_err(ApiError::query_failed)?;

    let rows: Vec<Record> = rows
        .into_iter()
        .filter(|row| {
            row.get("ArticleNumber")
                .and_then(Value::as_str)
                .is_some_and(|article| query.matches(article))
        })
        .collect();
    Ok(Json(rows))
}

/// Trigger a restart of the deployed service
pub async fn restart(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = state.restart.as_ref().ok_or(ApiError::RestartUnavailable)?;

    match client.trigger().await {
        Ok(RestartOutcome::Triggered) => Ok(Json(json!({
            "message": "Service restart triggered successfully"
        }))),
        Ok(RestartOutcome::Rejected { status, body }) => Err(ApiError::Restart {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            details: body,
        }),
        Err(e) => Err(ApiError::Restart {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            details: e.to_string(),
        }),
    }
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "backend": state.backend(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::{RestartSettings, Settings};
    use crate::network::HttpClient;
    use crate::store::fixture::FixtureStore;
    use crate::web::{create_router, AppState};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rows() -> Vec<Value> {
        vec![
            json!({"LotID": "L1", "ArticleNumber": "AB 12", "ShiftStartTime": "2024-03-01T06:00:00"}),
            json!({"LotID": "L2", "ArticleNumber": "ab12", "ShiftStartTime": "2024-03-02T23:59:59"}),
            json!({"LotID": "L3", "ArticleNumber": "CD-34", "ShiftStartTime": "2024-03-03T00:00:00"}),
            json!({"LotID": "L4", "ArticleNumber": null, "ShiftStartTime": "2024-02-29T23:59:59"}),
        ]
    }

    fn state_with(store: Arc<FixtureStore>, restart: RestartSettings) -> AppState {
        let settings = Settings {
            restart,
            ..Default::default()
        };
        AppState::new(settings, store, HttpClient::new().unwrap())
    }

    async fn call(state: AppState, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        call(state, Method::GET, uri).await
    }

    fn lots(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|r| r["LotID"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_data_by_lot() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state, "/api/data?lotId=L1,%20L2%20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lots(&body), vec!["L1", "L2"]);
    }

    #[tokio::test]
    async fn test_lot_takes_precedence_over_dates() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (_, body) = get(
            state,
            "/api/data?lotId=L3&startDate=2024-03-01&endDate=2024-03-02",
        )
        .await;
        assert_eq!(lots(&body), vec!["L3"]);
    }

    #[tokio::test]
    async fn test_data_by_date_range_is_inclusive() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state, "/api/data?startDate=2024-03-01&endDate=2024-03-02").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lots(&body), vec!["L1", "L2"]);
    }

    #[tokio::test]
    async fn test_data_without_filter_is_empty() {
        let store = Arc::new(FixtureStore::new(rows()));
        let state = state_with(store.clone(), Default::default());

        let (status, body) = get(state.clone(), "/api/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (_, body) = get(state, "/api/data?startDate=2024-03-01").await;
        assert_eq!(body, json!([]));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_reversed_date_range_is_queried_and_empty() {
        let store = Arc::new(FixtureStore::new(rows()));
        let state = state_with(store.clone(), Default::default());
        let (status, body) = get(state, "/api/data?startDate=2024-03-03&endDate=2024-03-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_data_store_failure_is_500() {
        let state = state_with(Arc::new(FixtureStore::failing()), Default::default());
        let (status, body) = get(state, "/api/data?lotId=L1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Database query failed"}));
    }

    #[tokio::test]
    async fn test_unique_article_numbers() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state.clone(), "/api/unique-article-numbers?q=Ab").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["AB 12"]));

        let (_, body) = get(state, "/api/unique-article-numbers?q=cd").await;
        assert_eq!(body, json!(["CD-34"]));
    }

    #[tokio::test]
    async fn test_unique_article_numbers_cached_per_query() {
        let store = Arc::new(FixtureStore::new(vec![
            json!({"LotID": "L1", "ArticleNumber": "AB 12"}),
            json!({"LotID": "L2", "ArticleNumber": "AB 99"}),
            json!({"LotID": "L3", "ArticleNumber": "CD-34"}),
        ]));
        let state = state_with(store.clone(), Default::default());

        let (_, body) = get(state.clone(), "/api/unique-article-numbers?q=ab").await;
        assert_eq!(body, json!(["AB 12", "AB 99"]));

        let (_, body) = get(state.clone(), "/api/unique-article-numbers?q=ab9").await;
        assert_eq!(body, json!(["AB 99"]));

        let (_, body) = get(state, "/api/unique-article-numbers?q=%20AB").await;
        assert_eq!(body, json!(["AB 12", "AB 99"]));
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_unique_article_numbers_without_query() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state, "/api/unique-article-numbers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_unique_article_numbers_failure() {
        let state = state_with(Arc::new(FixtureStore::failing()), Default::default());
        let (status, body) = get(state, "/api/unique-article-numbers?q=ab").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to fetch article numbers"}));
    }

    #[tokio::test]
    async fn test_data_by_article_normalizes() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state.clone(), "/api/data-by-article?articles=AB%2012").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lots(&body), vec!["L1", "L2"]);

        let (_, body) = get(state, "/api/data-by-article?articles=,%20,").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_restart_not_configured() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = call(state, Method::POST, "/api/restart").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Restart is not configured"}));
    }

    #[tokio::test]
    async fn test_restart_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/srv-1/restart"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let restart = RestartSettings {
            service_id: Some("srv-1".to_string()),
            api_key: Some("key".to_string()),
            api_base_url: server.uri(),
        };
        let state = state_with(Arc::new(FixtureStore::new(rows())), restart);
        let (status, body) = call(state, Method::POST, "/api/restart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Service restart triggered successfully"}));
    }

    #[tokio::test]
    async fn test_restart_relays_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let restart = RestartSettings {
            service_id: Some("srv-1".to_string()),
            api_key: Some("wrong".to_string()),
            api_base_url: server.uri(),
        };
        let state = state_with(Arc::new(FixtureStore::new(rows())), restart);
        let (status, body) = call(state, Method::POST, "/api/restart").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["details"], "unauthorized");
    }

    #[tokio::test]
    async fn test_restart_unreachable_upstream_is_500() {
        let restart = RestartSettings {
            service_id: Some("srv-1".to_string()),
            api_key: Some("key".to_string()),
            api_base_url: "http://127.0.0.1:1".to_string(),
        };
        let state = state_with(Arc::new(FixtureStore::new(rows())), restart);
        let (status, body) = call(state, Method::POST, "/api/restart").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to restart service");
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_with(Arc::new(FixtureStore::new(rows())), Default::default());
        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "mysql");
    }
}
