//! HTTP routes.
//!
//! Every session- and NPC-scoped route requires the caller's identity in
//! the `X-Client-UUID` header. Identities are anonymous and issued by
//! `POST /auth/uuid`.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use affinitas_domain::{Affinitas, ChatEntry, ChatRole, ClientId, NpcId, QuestId, SaveId, SessionId};

use crate::app::App;
use crate::prompt_templates::item_received_message;
use crate::use_cases::{
    NewSession, QuestError, QuestText, SessionError, TurnError, ViewError,
};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/auth/uuid", post(issue_client_uuid))
        .route("/session/new", get(new_game))
        .route("/session/save", post(save_game))
        .route("/session", delete(quit_game))
        .route("/session/action-points", patch(set_action_points))
        .route("/session/item", post(give_session_item))
        .route("/session/generate-ending", post(generate_ending))
        .route("/saves", get(list_saves))
        .route("/saves/load", post(load_game))
        .route("/saves/{save_id}", delete(delete_save))
        .route("/npcs/{npc_id}/chat", post(chat))
        .route("/npcs/{npc_id}/quest", post(activate_quests))
        .route("/npcs/{npc_id}/quest/complete", post(complete_quest))
        .route("/npcs/{npc_id}/item", post(give_npc_item))
}

async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Client identity
// =============================================================================

/// Caller identity, taken from the `X-Client-UUID` header.
pub struct ClientUuid(pub ClientId);

impl<S: Send + Sync> FromRequestParts<S> for ClientUuid {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-client-uuid")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing X-Client-UUID header".to_string()))?;
        let uuid = uuid::Uuid::parse_str(raw)
            .map_err(|_| ApiError::BadRequest("Invalid X-Client-UUID header".to_string()))?;
        Ok(ClientUuid(ClientId::from_uuid(uuid)))
    }
}

#[derive(Serialize)]
struct IssuedUuid {
    client_uuid: ClientId,
}

async fn issue_client_uuid() -> Json<IssuedUuid> {
    Json(IssuedUuid {
        client_uuid: ClientId::new(),
    })
}

// =============================================================================
// Session lifecycle
// =============================================================================

async fn new_game(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
) -> Result<Json<NewSession>, ApiError> {
    Ok(Json(app.session.new_game(client).await?))
}

#[derive(Deserialize)]
struct LoadRequest {
    save_id: SaveId,
}

async fn load_game(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Json(request): Json<LoadRequest>,
) -> Result<Json<NewSession>, ApiError> {
    Ok(Json(app.session.load_game(client, request.save_id).await?))
}

#[derive(Deserialize)]
struct SaveRequest {
    session_id: SessionId,
    name: String,
}

async fn save_game(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Json(request): Json<SaveRequest>,
) -> Result<Json<affinitas_domain::SaveSummary>, ApiError> {
    let summary = app
        .session
        .save_game(client, request.session_id, request.name)
        .await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: SessionId,
}

async fn quit_game(
    State(app): State<Arc<App>>,
    ClientUuid(_client): ClientUuid,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.session.quit(query.session_id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

#[derive(Deserialize)]
struct ActionPointsRequest {
    session_id: SessionId,
    action_points: i32,
}

async fn set_action_points(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Json(request): Json<ActionPointsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.session
        .set_action_points(client, request.session_id, request.action_points)
        .await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

#[derive(Deserialize)]
struct SessionItemRequest {
    session_id: SessionId,
    name: String,
}

async fn give_session_item(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Json(request): Json<SessionItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.session
        .give_item(client, request.session_id, request.name)
        .await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

#[derive(Serialize)]
struct EndingResponse {
    ending: String,
}

async fn generate_ending(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Json(request): Json<SessionQuery>,
) -> Result<Json<EndingResponse>, ApiError> {
    let ending = app
        .session
        .generate_ending(client, request.session_id)
        .await?;
    Ok(Json(EndingResponse { ending }))
}

// =============================================================================
// Saves
// =============================================================================

async fn list_saves(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
) -> Result<Json<Vec<affinitas_domain::SaveSummary>>, ApiError> {
    Ok(Json(app.session.list_saves(client).await?))
}

async fn delete_save(
    State(app): State<Arc<App>>,
    ClientUuid(client): ClientUuid,
    Path(save_id): Path<SaveId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.session.delete_save(client, save_id).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

// =============================================================================
// NPC conversation and quests
// =============================================================================

#[derive(Deserialize)]
struct ChatTurnRequest {
    session_id: SessionId,
    message: String,
    /// `user` (default) gets a judged reply; `system` is recorded
    /// fire-and-forget.
    #[serde(default)]
    role: Option<ChatRole>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    affinitas: Affinitas,
    completed_quests: Vec<QuestId>,
}

async fn chat(
    State(app): State<Arc<App>>,
    ClientUuid(_client): ClientUuid,
    Path(npc_id): Path<NpcId>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    let entry = match request.role.unwrap_or(ChatRole::User) {
        ChatRole::User => ChatEntry::user(request.message),
        ChatRole::System => ChatEntry::system(request.message),
        ChatRole::Ai => {
            return Err(ApiError::BadRequest(
                "ai-authored turns are not accepted".to_string(),
            ))
        }
    };

    let turn = app
        .chat
        .process(request.session_id, &npc_id, entry, false)
        .await?;
    match turn.outcome {
        Some(outcome) => Ok(Json(ChatResponse {
            response: outcome.reply,
            affinitas: outcome.affinitas,
            completed_quests: outcome.completed_quests,
        })
        .into_response()),
        // System entries are recorded in the background; nothing to say.
        None => Ok(axum::http::StatusCode::NO_CONTENT.into_response()),
    }
}

async fn activate_quests(
    State(app): State<Arc<App>>,
    ClientUuid(_client): ClientUuid,
    Path(npc_id): Path<NpcId>,
    Json(request): Json<SessionQuery>,
) -> Result<Json<Vec<QuestText>>, ApiError> {
    Ok(Json(app.quest.activate(request.session_id, &npc_id).await?))
}

#[derive(Deserialize)]
struct CompleteQuestRequest {
    session_id: SessionId,
    quest_id: QuestId,
}

#[derive(Serialize)]
struct CompleteQuestResponse {
    affinitas: Affinitas,
}

async fn complete_quest(
    State(app): State<Arc<App>>,
    ClientUuid(_client): ClientUuid,
    Path(npc_id): Path<NpcId>,
    Json(request): Json<CompleteQuestRequest>,
) -> Result<Json<CompleteQuestResponse>, ApiError> {
    let affinitas = app
        .quest
        .complete(request.session_id, &npc_id, &request.quest_id)
        .await?;
    Ok(Json(CompleteQuestResponse { affinitas }))
}

#[derive(Deserialize)]
struct NpcItemRequest {
    session_id: SessionId,
    item_name: String,
}

async fn give_npc_item(
    State(app): State<Arc<App>>,
    ClientUuid(_client): ClientUuid,
    Path(npc_id): Path<NpcId>,
    Json(request): Json<NpcItemRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // Hand-overs are system-authored but still want an in-character
    // reaction, so the judge is invoked.
    let turn = app
        .chat
        .process(
            request.session_id,
            &npc_id,
            ChatEntry::system(item_received_message(&request.item_name)),
            true,
        )
        .await?;
    let outcome = turn
        .outcome
        .ok_or_else(|| ApiError::Internal("forced turn produced no outcome".to_string()))?;
    Ok(Json(ChatResponse {
        response: outcome.reply,
        affinitas: outcome.affinitas,
        completed_quests: outcome.completed_quests,
    }))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Conflict(&'static str),
    BadRequest(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound(what) => {
                (axum::http::StatusCode::NOT_FOUND, what).into_response()
            }
            ApiError::Conflict(msg) => {
                (axum::http::StatusCode::CONFLICT, msg).into_response()
            }
            ApiError::BadRequest(msg) => {
                (axum::http::StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                )
                    .into_response()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Conflict => {
                ApiError::Conflict("An active session already exists for this client")
            }
            SessionError::SessionNotFound => ApiError::NotFound("Session not found"),
            SessionError::SaveNotFound => ApiError::NotFound("Save not found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::View(ViewError::SessionNotFound) => ApiError::NotFound("Session not found"),
            TurnError::View(ViewError::NpcNotFound) => ApiError::NotFound("NPC not found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QuestError> for ApiError {
    fn from(e: QuestError) -> Self {
        match e {
            QuestError::SessionNotFound => ApiError::NotFound("Session not found"),
            QuestError::NpcNotFound => ApiError::NotFound("NPC not found"),
            QuestError::QuestNotFound => ApiError::NotFound("Active quest not found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
