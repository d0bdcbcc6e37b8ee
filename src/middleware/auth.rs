use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, TokenKind},
};

type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

fn claims_from_header(state: &AppState, header: BearerHeader) -> Result<Claims, AppError> {
    let TypedHeader(Authorization(bearer)) = header.map_err(|e| {
        tracing::debug!("Authorization header rejected: {}", e);
        AppError::Auth("缺少或格式错误的 Bearer 令牌".to_string())
    })?;

    state.tokens.validate(bearer.token())
}

/// 受保护路由：只接受访问令牌，校验通过后把 `Claims` 放进请求扩展。
pub async fn auth_middleware(
    State(state): State<AppState>,
    header: BearerHeader,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_header(&state, header)?;

    if claims.kind != TokenKind::Access {
        return Err(AppError::Auth("需要访问令牌".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 刷新路由：访问令牌与刷新令牌均可。
pub async fn refresh_auth_middleware(
    State(state): State<AppState>,
    header: BearerHeader,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_header(&state, header)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 路径中的用户ID必须是调用者本人
pub fn require_subject(claims: &Claims, user_id: i64) -> Result<(), AppError> {
    if claims.sub != user_id {
        tracing::warn!(
            "User {} attempted to act on behalf of user {}",
            claims.sub,
            user_id
        );
        return Err(AppError::Forbidden("无权操作其他用户".to_string()));
    }
    Ok(())
}
