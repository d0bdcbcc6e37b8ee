use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, AppResult},
    utils::{AppJson, AppPath, AppQuery, Claims},
};

use super::model::{ChatAuthority, CreateChatRequest, IncludeQuery};

#[axum::debug_handler]
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let chats = ChatAuthority::new(&state.store)
        .list_for_user(claims.sub)
        .await?;

    Ok(Json(chats))
}

#[axum::debug_handler]
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateChatRequest>,
) -> AppResult<impl IntoResponse> {
    if req.owner_id.is_some_and(|owner_id| owner_id != claims.sub) {
        return Err(AppError::Forbidden("不能以其他用户身份创建聊天".to_string()));
    }

    let info = ChatAuthority::new(&state.store)
        .create_chat(claims.sub, &req.name, req.personal, &req.members)
        .await?;

    Ok((StatusCode::CREATED, Json(info)))
}

#[axum::debug_handler]
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppQuery(query): AppQuery<IncludeQuery>,
) -> AppResult<impl IntoResponse> {
    let authority = ChatAuthority::new(&state.store);
    let chat = authority.authorize(id, claims.sub).await?;
    let info = authority.get_chat(chat.id, query.users()).await?;

    Ok(Json(info))
}

#[axum::debug_handler]
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    let authority = ChatAuthority::new(&state.store);
    let chat = authority.authorize(id, claims.sub).await?;
    authority.delete_chat(&chat, claims.sub).await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn exit_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    let authority = ChatAuthority::new(&state.store);
    let chat = authority.authorize(id, claims.sub).await?;
    authority.exit_chat(&chat, claims.sub).await?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn clean_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    let authority = ChatAuthority::new(&state.store);
    let chat = authority.authorize(id, claims.sub).await?;
    let removed = authority.clean_chat(&chat, claims.sub).await?;

    Ok(Json(json!({ "success": true, "removed": removed })))
}
