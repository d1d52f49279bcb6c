use crate::cache::TableCache;
use crate::charts::{build_charts, ChartTab};
use crate::config::AppConfig;
use crate::error::DashboardError;
use crate::filter::{FilterPanel, FilterSpec, FilterState};
use crate::map::{build_map, CityCoordinates, MapData};
use crate::nav::Page;
use crate::processing::{summarize, Summary};
use crate::render::{render_dashboard, RenderContext};
use crate::types::View;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, RawQuery, State},
    response::{Html, Json, Redirect},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct AppState {
    pub config: AppConfig,
    pub cache: TableCache,
    pub spec: FilterSpec,
    pub coords: CityCoordinates,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let cache = TableCache::new(&config.input.data_file, config.input.sheet.clone());
        let coords = CityCoordinates::with_extra(&config.map.cities);
        AppState { config, cache, spec: FilterSpec::standard(), coords }
    }

    pub fn render_context(&self) -> RenderContext<'_> {
        RenderContext { spec: &self.spec, coords: &self.coords, map: &self.config.map }
    }

    /// Apply the filters in `query` and hand the non-empty view to `f`.
    fn with_view<T>(&self, query: Option<&str>, f: impl FnOnce(&View<'_>) -> T) -> Result<T, DashboardError> {
        let table = self.cache.get()?;
        let filters = FilterState::from_query(query.unwrap_or_default());
        let view = self.spec.apply(&table, &filters);
        if view.is_empty() {
            return Err(DashboardError::NoData);
        }
        Ok(f(&view))
    }
}

#[derive(Deserialize)]
pub struct ResetParams {
    page: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rows: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/charts", get(charts_page))
        .route("/map", get(map_page))
        .route("/reset", get(reset_filters))
        .route("/api/summary", get(summary_api))
        .route("/api/charts", get(charts_api))
        .route("/api/markers", get(markers_api))
        .route("/api/filters", get(filters_api))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>) -> Result<()> {
    // Fail at startup rather than on the first request.
    let table = state.cache.get()
        .with_context(|| format!("Failed to load data file: {:?}", state.cache.path()))?;
    info!(rows = table.row_count(), "Data ready");

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting server on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn page_response(state: &AppState, page: Page, query: Option<String>) -> Result<Html<String>, DashboardError> {
    let table = state.cache.get()?;
    let filters = FilterState::from_query(query.as_deref().unwrap_or_default());
    let rendered = render_dashboard(page, &table, &state.render_context(), &filters);
    Ok(Html(rendered.html))
}

async fn home_page(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, DashboardError> {
    page_response(&state, Page::Home, query)
}

async fn charts_page(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, DashboardError> {
    page_response(&state, Page::Charts, query)
}

async fn map_page(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, DashboardError> {
    page_response(&state, Page::Map, query)
}

async fn reset_filters(Query(params): Query<ResetParams>) -> Redirect {
    let page = params.page.as_deref().and_then(|p| p.parse::<Page>().ok()).unwrap_or_default();
    Redirect::to(page.path())
}

async fn summary_api(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Summary>, DashboardError> {
    state.with_view(query.as_deref(), summarize).map(Json)
}

async fn charts_api(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ChartTab>>, DashboardError> {
    state.with_view(query.as_deref(), build_charts).map(Json)
}

async fn markers_api(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<MapData>, DashboardError> {
    state
        .with_view(query.as_deref(), |view| build_map(view, &state.coords, &state.config.map))
        .map(Json)
}

async fn filters_api(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<FilterPanel>, DashboardError> {
    let table = state.cache.get()?;
    let filters = FilterState::from_query(query.as_deref().unwrap_or_default());
    Ok(Json(state.spec.panel(&table, &filters)))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, DashboardError> {
    let table = state.cache.get()?;
    Ok(Json(HealthResponse { status: "ok".to_string(), rows: table.row_count() }))
}
