use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::report::{analyze, cached_or_analyze, export_filename, AnalysisReport};
use super::templates::{self, GraphView};
use super::AppState;
use crate::analytics::{PostSort, RoleFilter};
use crate::constants::{BROWSER_USER_AGENT, MAX_LAYOUT_TICKS, PINNED_LAYOUT_TICKS};
use crate::discourse::IngestError;
use crate::graph::Palette;
use crate::layout::{
    hit_test, spotlight, HoverCard, LayoutSettings, LayoutSnapshot, Pin, Simulation, Viewport,
};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/graph", get(graph_page))
        .route("/proxy", get(proxy))
        .route("/api/analyze", get(api_analyze))
        .route("/api/export", get(api_export))
        .route("/api/progress", get(api_progress))
        .route("/healthz", get(health))
}

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    url: Option<String>,
}

impl UrlParams {
    fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn ingest_status(e: &IngestError) -> StatusCode {
    match e {
        IngestError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
        IngestError::Cancelled => StatusCode::CONFLICT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn ingest_error_response(e: &IngestError) -> Response {
    if e.is_client_error() {
        warn!("Rejected analysis request: {e}");
    } else {
        error!("Analysis failed: {e:#}");
    }
    json_error(ingest_status(e), e.to_string())
}

// ========== HTML Routes ==========

async fn home() -> Response {
    templates::render_home(None, "").into_response()
}

/// Query parameters of the graph page.
///
/// `url` selects the thread; everything else only changes how the cached
/// report is viewed, unless `refresh` asks for a new ingestion.
#[derive(Debug, Deserialize)]
pub struct GraphParams {
    url: Option<String>,
    refresh: Option<String>,
    hover: Option<String>,
    /// Screen point `x,y` to hit-test; the node under it becomes the hover.
    pick: Option<String>,
    /// Colour nodes by role; `false` draws them all alike.
    roles: Option<bool>,
    #[serde(default)]
    filter: RoleFilter,
    #[serde(default)]
    sort: PostSort,
    scale: Option<f64>,
    tx: Option<f64>,
    ty: Option<f64>,
    /// Held nodes, `id,x,y` separated by `;`.
    pin: Option<String>,
    /// Drag node `drag` to (`drag_x`, `drag_y`) and hold it there.
    drag: Option<String>,
    drag_x: Option<f64>,
    drag_y: Option<f64>,
    /// Let go of a held node and let the layout relax around it.
    release: Option<String>,
}

impl GraphParams {
    fn refresh(&self) -> bool {
        is_set(self.refresh.as_deref())
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.scale.unwrap_or(1.0),
            self.tx.unwrap_or(0.0),
            self.ty.unwrap_or(0.0),
        )
    }

    fn pins(&self) -> Vec<Pin> {
        let mut pins = self.pin.as_deref().map(Pin::parse_list).unwrap_or_default();
        if let (Some(id), Some(x), Some(y)) = (self.drag.as_deref(), self.drag_x, self.drag_y) {
            let id = id.trim();
            if !id.is_empty() && x.is_finite() && y.is_finite() {
                pins.retain(|p| p.id != id);
                pins.push(Pin {
                    id: id.to_string(),
                    x,
                    y,
                });
            }
        }
        pins
    }
}

/// Checkbox-style flag: `1`, `true`, `yes` or `on`.
fn is_set(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

fn parse_point(input: &str) -> Option<(f64, f64)> {
    let (x, y) = input.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

/// Settle the layout, then drag each pinned node into place and hold it.
/// A released node is let go afterwards and the layout relaxes again.
fn lay_out(
    state: &AppState,
    report: &AnalysisReport,
    pins: &[Pin],
    release: Option<&str>,
) -> LayoutSnapshot {
    let mut simulation = Simulation::new(LayoutSettings::with_canvas(
        state.config.canvas_width,
        state.config.canvas_height,
    ));
    simulation.load(&report.graph);
    let mut snapshot = simulation.run_until_settled(MAX_LAYOUT_TICKS);

    let mut held = 0;
    for pin in pins {
        if simulation.begin_drag(&pin.id) && simulation.drag_to(&pin.id, pin.x, pin.y) {
            held += 1;
        }
    }
    if held > 0 {
        snapshot = simulation.run_until_settled(PINNED_LAYOUT_TICKS);
        if let Some(id) = release {
            if simulation.end_drag(id) {
                snapshot = simulation.run_until_settled(MAX_LAYOUT_TICKS);
            }
        }
    }

    debug!(
        ticks = snapshot.tick,
        state = ?snapshot.state,
        pinned = held,
        "Layout computed"
    );
    snapshot
}

async fn graph_page(State(state): State<AppState>, Query(params): Query<GraphParams>) -> Response {
    let Some(url) = params.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return templates::render_home(Some("Enter a thread URL."), "").into_response();
    };

    let report = match cached_or_analyze(&state, url, params.refresh()).await {
        Ok(report) => report,
        Err(e) => {
            let status = ingest_status(&e);
            if e.is_client_error() {
                warn!("Rejected graph request: {e}");
            } else {
                error!("Graph analysis failed: {e:#}");
            }
            return (status, templates::render_home(Some(&e.to_string()), url)).into_response();
        }
    };

    let mut pins = params.pins();
    let release = params.release.as_deref().map(str::trim);
    let snapshot = lay_out(&state, &report, &pins, release);
    if let Some(id) = release {
        pins.retain(|p| p.id != id);
    }

    let viewport = params.viewport();
    let picked = params
        .pick
        .as_deref()
        .and_then(parse_point)
        .map(|(sx, sy)| viewport.to_world(sx, sy))
        .and_then(|(wx, wy)| hit_test(&snapshot, wx, wy));
    let hovered = picked.or_else(|| {
        params
            .hover
            .as_deref()
            .filter(|id| report.graph.node(id).is_some())
    });

    let lights = spotlight(&snapshot, hovered);
    let hover_card = hovered.map(|id| HoverCard::new(id, &report.summary.personas));
    let palette = if params.roles.unwrap_or(true) {
        Palette::Roles
    } else {
        Palette::Uniform
    };

    templates::render_graph_page(&GraphView {
        url,
        report: &report,
        snapshot: &snapshot,
        spotlight: &lights,
        hover_card: hover_card.as_ref(),
        palette,
        filter: params.filter,
        sort: params.sort,
        viewport,
        pins: &pins,
    })
    .into_response()
}

async fn health() -> &'static str {
    "ok"
}

// ========== Relay ==========

/// Forward a GET to an arbitrary upstream URL, returning its status and body
/// unchanged.
async fn proxy(State(state): State<AppState>, Query(params): Query<UrlParams>) -> Response {
    let Some(url) = params.url() else {
        return json_error(StatusCode::BAD_REQUEST, "URL is required");
    };

    let upstream = match state
        .http
        .get(url)
        .header(header::USER_AGENT, BROWSER_USER_AGENT)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            error!(url = %url, "Relay request failed: {e:#}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    match upstream.bytes().await {
        Ok(body) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!(url = %url, "Relay body read failed: {e:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ========== JSON API ==========

/// Export reuses the report the page is showing unless `refresh` is set.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    url: Option<String>,
    refresh: Option<String>,
}

async fn api_analyze(State(state): State<AppState>, Query(params): Query<UrlParams>) -> Response {
    let Some(url) = params.url() else {
        return json_error(StatusCode::BAD_REQUEST, "URL is required");
    };

    match analyze(&state, url).await {
        Ok(report) => Json(report.as_ref()).into_response(),
        Err(e) => ingest_error_response(&e),
    }
}

async fn api_export(State(state): State<AppState>, Query(params): Query<ExportParams>) -> Response {
    let Some(url) = params.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "URL is required");
    };

    let report = match cached_or_analyze(&state, url, is_set(params.refresh.as_deref())).await {
        Ok(report) => report,
        Err(e) => return ingest_error_response(&e),
    };

    let body = match serde_json::to_string_pretty(report.as_ref()) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize export: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Serialization error");
        }
    };
    let filename = export_filename(report.thread.thread_id, chrono::Utc::now().date_naive());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn api_progress(State(state): State<AppState>) -> Response {
    Json(json!({
        "busy": state.runs.is_busy(),
        "lines": state.runs.progress(),
    }))
    .into_response()
}
