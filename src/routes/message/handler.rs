use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, AppResult},
    routes::chat::ChatAuthority,
    utils::{AppJson, AppPath, AppQuery, Claims},
};

use super::model::{CreateMessageRequest, LastIdResponse, MessageGateway, PageQuery};

fn gateway(state: &AppState) -> MessageGateway<'_> {
    MessageGateway::new(
        &state.store,
        state.config.message_ttl(),
        state.config.page_limit,
    )
}

#[axum::debug_handler]
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateMessageRequest>,
) -> AppResult<impl IntoResponse> {
    if req.user_id.is_some_and(|user_id| user_id != claims.sub) {
        return Err(AppError::Forbidden("不能以其他用户身份发送消息".to_string()));
    }

    let message = gateway(&state)
        .create(claims.sub, req.chat_id, &req.text)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    let gateway = gateway(&state);
    let message = gateway.find(id).await?;
    gateway.delete(&message, claims.sub).await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(chat_id): AppPath<i64>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let chat = ChatAuthority::new(&state.store)
        .authorize(chat_id, claims.sub)
        .await?;
    let messages = gateway(&state)
        .list_by_chat(chat.id, query.page.unwrap_or(1))
        .await?;

    Ok(Json(messages))
}

#[axum::debug_handler]
pub async fn last_message_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(chat_id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    let chat = ChatAuthority::new(&state.store)
        .authorize(chat_id, claims.sub)
        .await?;
    let last_id = gateway(&state).last_id(chat.id).await?;

    Ok(Json(LastIdResponse { last_id }))
}
