use crate::api::{SearchResponse, SearchResult};
use crate::content::{EntryHtml, render_entry};
use crate::link::{LinkClassification, LinkRules, extract_word};
use crate::placement::{
    AnchorRect, DEFAULT_PADDING, PanelSize, PopoverPosition, Viewport, place_popover,
};
use crate::popover::{Popover, PreviewLoad, PreviewPanel};
use crate::styles::{StyleRegistry, StylesheetRegistration};
use crate::text::extract_audio_url;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

type SharedState = Arc<AppState>;

#[derive(Clone, Default)]
pub struct AppState {
    pub rules: LinkRules,
    pub panel: PanelSize,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub rules: LinkRules,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            rules: LinkRules::default(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        rules: config.rules.clone(),
        panel: PanelSize::default(),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        asset_prefix = %config.rules.asset_prefix,
        api_prefix = %config.rules.api_prefix,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/links/classify", get(api_classify))
        .route("/api/content/render", post(api_render))
        .route("/api/preview/panel", post(api_preview_panel))
        .route("/api/popover/place", get(api_place))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "dictlink-web" }))
}

#[derive(Debug, Deserialize)]
struct ClassifyParams {
    href: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifyPayload {
    href: String,
    classification: String,
    word: Option<String>,
}

async fn api_classify(
    State(state): State<SharedState>,
    Query(params): Query<ClassifyParams>,
) -> Result<Json<ClassifyPayload>, ApiError> {
    let href = params
        .href
        .ok_or_else(|| ApiError::bad_request("Provide ?href="))?;
    let classification = state.rules.classify(&href);
    let word = if classification == LinkClassification::InternalWordLink {
        extract_word(&href)
    } else {
        None
    };
    Ok(Json(ClassifyPayload {
        classification: classification.to_string(),
        href,
        word,
    }))
}

#[derive(Debug, Deserialize)]
struct RenderRequest {
    dict_id: String,
    html: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RenderPayload {
    html: String,
    stylesheets: Vec<StylesheetRegistration>,
    head: String,
    words: Vec<String>,
    audio_url: Option<String>,
}

async fn api_render(
    State(state): State<SharedState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderPayload>, ApiError> {
    if request.dict_id.trim().is_empty() {
        return Err(ApiError::bad_request("dict_id cannot be empty"));
    }
    let mut styles = StyleRegistry::with_rules(state.rules.clone());
    let stylesheets = styles.ensure_dictionary_styles(&request.html, &request.dict_id);
    let rendered = render_entry(&EntryHtml::new(request.html.as_str()), &state.rules);
    let words = rendered
        .links
        .iter()
        .filter_map(|link| link.word.as_ref().map(|word| word.to_string()))
        .collect();
    Ok(Json(RenderPayload {
        html: rendered.html,
        head: styles.head_markup(),
        stylesheets,
        words,
        audio_url: extract_audio_url(&request.html),
    }))
}

#[derive(Debug, Deserialize)]
struct PanelRequest {
    word: String,
    #[serde(default)]
    results: Option<Vec<SearchResult>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    anchor: Option<AnchorRect>,
    #[serde(default)]
    viewport: Option<Viewport>,
}

#[derive(Debug, Serialize)]
struct PanelPayload {
    panel: PreviewPanel,
    position: Option<PopoverPosition>,
    html: Option<String>,
}

async fn api_preview_panel(
    State(state): State<SharedState>,
    Json(request): Json<PanelRequest>,
) -> Result<Json<PanelPayload>, ApiError> {
    let word = request.word.trim();
    if word.is_empty() {
        return Err(ApiError::bad_request("word cannot be empty"));
    }
    let load = match (request.error, request.results) {
        (Some(message), _) => PreviewLoad::Failed(message),
        (None, Some(results)) => PreviewLoad::Loaded(SearchResponse { results }),
        (None, None) => PreviewLoad::Loading,
    };
    let panel = PreviewPanel::from_load(word, &load);
    let popover = match (request.anchor, request.viewport) {
        (Some(anchor), Some(viewport)) => Some(Popover {
            position: place_popover(&anchor, &viewport, &state.panel, DEFAULT_PADDING),
            panel: panel.clone(),
        }),
        _ => None,
    };
    Ok(Json(PanelPayload {
        panel,
        position: popover.as_ref().map(|popover| popover.position),
        html: popover.as_ref().map(Popover::render_html),
    }))
}

#[derive(Debug, Deserialize)]
struct PlaceParams {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    viewport_width: f64,
    viewport_height: f64,
}

async fn api_place(
    State(state): State<SharedState>,
    Query(params): Query<PlaceParams>,
) -> Result<Json<PopoverPosition>, ApiError> {
    if params.viewport_width <= 0.0 || params.viewport_height <= 0.0 {
        return Err(ApiError::bad_request("viewport must have a positive size"));
    }
    let anchor = AnchorRect::new(params.left, params.top, params.width, params.height);
    let viewport = Viewport::new(params.viewport_width, params.viewport_height);
    Ok(Json(place_popover(
        &anchor,
        &viewport,
        &state.panel,
        DEFAULT_PADDING,
    )))
}
