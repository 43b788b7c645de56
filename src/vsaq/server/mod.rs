// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::error::QuestionnaireError;
use crate::vsaq::config::Config;
use crate::vsaq::questionnaire::{
    AnswerMap, DisplayMode, ItemTree, Questionnaire, Session, DEFAULT_DEBOUNCE,
};
use crate::vsaq::template::{TemplateFormat, TemplateLoader};

const TEMPLATE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

pub struct AppState {
    template_dir: PathBuf,
    loader: TemplateLoader,
    /// Free-text delay for every session opened by this server
    debounce: Duration,
}

impl AppState {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            loader: TemplateLoader::new(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.debounce,
            ..Self::new(&config.template_dir)
        }
    }

    /// Path of the template file for `id`, if one exists
    pub fn template_path(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return None;
        }
        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| self.template_dir.join(format!("{}.{}", id, ext)))
            .find(|path| path.is_file())
    }

    async fn load_tree(&self, id: &str) -> Result<ItemTree, QuestionnaireError> {
        let path = self
            .template_path(id)
            .ok_or_else(|| QuestionnaireError::config(format!("Template not found: {}", id)))?;
        let format = TemplateFormat::from_path(&path)
            .ok_or_else(|| QuestionnaireError::config(format!("Unsupported template: {}", id)))?;
        let content = fs::read_to_string(&path).await?;
        self.loader.parse(&content, format)
    }

    /// Start a session on a freshly loaded template
    pub async fn open_session(&self, template_id: &str, mode: DisplayMode) -> Result<Session, QuestionnaireError> {
        let tree = self.load_tree(template_id).await?;
        let questionnaire = Questionnaire::from_tree(tree, mode)?;
        Ok(Session::new(questionnaire, self.debounce))
    }

    /// Load a template, import the answers and report the outcome
    pub async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluateResponse, QuestionnaireError> {
        let mut session = self.open_session(&request.template_id, request.mode).await?;
        session.set_values(&request.answers).await?;
        let shared = session.questionnaire();
        let questionnaire = shared.lock().await;

        Ok(EvaluateResponse {
            visible: questionnaire.visible_ids(),
            hidden: questionnaire.hidden_ids(),
            answers: questionnaire.values().clone(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/templates", get(list_templates))
        .route("/api/templates/{id}", get(get_template))
        .route("/api/evaluate", post(evaluate))
        .route("/api/evaluate/stream", post(stream_evaluation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(Arc::new(AppState::from_config(config)));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    log::info!(
        "Serving templates from {} on http://{}",
        config.template_dir.display(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut templates = Vec::new();
    if let Ok(mut entries) = fs::read_dir(&state.template_dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if TemplateFormat::from_path(&path).is_none() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                templates.push(json!({
                    "id": stem,
                    "name": stem,
                    "file": path.to_string_lossy()
                }));
            }
        }
    }
    templates.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
    Json(json!(templates))
}

async fn get_template(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<Value> {
    let Some(path) = state.template_path(&id) else {
        return Json(json!({"error": "Template not found"}));
    };

    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => return Json(json!({"error": e.to_string()})),
    };
    let parsed = match TemplateFormat::from_path(&path) {
        Some(TemplateFormat::Yaml) => serde_yaml::from_str::<Value>(&content).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()),
    };
    match parsed {
        Ok(template) => Json(template),
        Err(e) => Json(json!({"error": format!("Invalid template: {}", e)})),
    }
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub template_id: String,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub mode: DisplayMode,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
    pub answers: AnswerMap,
}

async fn evaluate(State(state): State<Arc<AppState>>, Json(payload): Json<EvaluateRequest>) -> Json<Value> {
    match state.evaluate(&payload).await {
        Ok(response) => Json(json!(response)),
        Err(e) => {
            log::warn!("Evaluation of '{}' failed: {}", payload.template_id, e);
            Json(json!({ "error": e.to_string() }))
        }
    }
}

async fn stream_evaluation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        log::info!("Starting streaming evaluation for template: {}", payload.template_id);

        let tree = match state.load_tree(&payload.template_id).await {
            Ok(tree) => tree,
            Err(e) => {
                let _ = tx.send(json!({"type": "error", "message": e.to_string()})).await;
                return;
            }
        };

        let mut questionnaire = Questionnaire::new(payload.mode);
        let mut events = questionnaire.subscribe();
        let mut session = Session::new(questionnaire, state.debounce);
        let mut outcome = session.reset(tree).await;
        if outcome.is_ok() {
            outcome = session.set_values(&payload.answers).await;
        }
        drop(session);

        while let Some(event) = events.recv().await {
            if tx.send(json!(event)).await.is_err() {
                return;
            }
        }
        if let Err(e) = outcome {
            log::error!("Streaming evaluation failed: {}", e);
            let _ = tx.send(json!({"type": "error", "message": e.to_string()})).await;
        }
    });

    let stream = ReceiverStream::new(rx).map(|message| {
        Ok(Event::default()
            .json_data(message)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(1)))
}
