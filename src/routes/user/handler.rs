use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::require_subject,
    utils::{AppJson, AppPath, Claims},
};

use super::model::{
    Credentials, LoginRequest, RegistrationRequest, ResetPasswordRequest, UpdateUserRequest,
};
use crate::routes::friend::FriendGraph;

fn credentials(state: &AppState) -> Credentials<'_> {
    Credentials::new(&state.store, state.config.bcrypt_cost)
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = credentials(&state).login(&req.login, &req.password).await?;
    let tokens = state.tokens.issue_pair(user.id)?;

    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegistrationRequest>,
) -> AppResult<impl IntoResponse> {
    let user = credentials(&state).register(&req).await?;
    let tokens = state.tokens.issue_pair(user.id)?;

    Ok((StatusCode::CREATED, Json(tokens)))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let user = credentials(&state).reset_password(&req).await?;
    let tokens = state.tokens.issue_pair(user.id)?;

    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    require_subject(&claims, id)?;

    // 用户必须仍然存在
    let user = credentials(&state).get(id).await?;
    let tokens = state.tokens.issue_pair(user.id)?;

    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> AppResult<impl IntoResponse> {
    require_subject(&claims, id)?;

    let user = credentials(&state).get(id).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    require_subject(&claims, id)?;
    if req.id != id {
        return Err(AppError::Forbidden("请求体中的用户ID与路径不一致".to_string()));
    }

    let user = credentials(&state).update(&req).await?;
    tracing::info!("User {} updated profile", user.id);

    Ok(Json(user))
}

/// 按登录名查找用户，只能查到自己或自己的好友
#[axum::debug_handler]
pub async fn find_by_login(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppPath(login): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let user = credentials(&state).find_by_login(&login).await?;

    let is_friend = FriendGraph::new(&state.store)
        .is_friend(claims.sub, user.id)
        .await?;
    if user.id != claims.sub && !is_friend {
        return Err(AppError::Forbidden("只能查看好友信息".to_string()));
    }

    Ok(Json(user))
}
