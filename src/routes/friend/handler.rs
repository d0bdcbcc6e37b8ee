use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::AppResult,
    middleware::require_subject,
    utils::{AppJson, AppPath, Claims},
};

use super::model::{AddFriendRequest, FriendGraph};

#[axum::debug_handler]
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    require_subject(&claims, id)?;

    let friends = FriendGraph::new(&state.store).list(id).await?;
    Ok(Json(friends))
}

#[axum::debug_handler]
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<AddFriendRequest>,
) -> AppResult<impl IntoResponse> {
    require_subject(&claims, id)?;

    let friend = FriendGraph::new(&state.store).add(id, &req.login).await?;
    Ok((StatusCode::CREATED, Json(friend)))
}

#[axum::debug_handler]
pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath((owner_id, friend_id)): AppPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    // 只有好友关系的所有者可以删除
    require_subject(&claims, owner_id)?;

    FriendGraph::new(&state.store)
        .remove(owner_id, friend_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}
