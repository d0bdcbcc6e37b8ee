use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    store::{Store, User},
    utils::{hash_password, verify_password},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub login: String,
    pub password: String,
    pub reset_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub login: String,
    pub reset_password: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub login: String,
    pub password: Option<String>,
}

/// 用户凭据：注册、登录、资料修改。两种失败（用户不存在 / 密码错误）对外不可区分。
pub struct Credentials<'a> {
    store: &'a Store,
    cost: u32,
}

fn invalid_credentials() -> AppError {
    AppError::NotFound("用户名或密码错误".to_string())
}

fn require_non_empty(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{}不能为空", field)));
    }
    Ok(())
}

impl<'a> Credentials<'a> {
    pub fn new(store: &'a Store, cost: u32) -> Self {
        Self { store, cost }
    }

    // 用户不存在时也做一次同等成本的哈希，两种失败耗时一致
    fn unknown_login(&self, password: &str) -> AppResult<User> {
        hash_password(password, self.cost)?;
        Err(invalid_credentials())
    }

    pub async fn login(&self, login: &str, password: &str) -> AppResult<User> {
        let Some(user) = self.store.find_user_by_login(login).await? else {
            return self.unknown_login(password);
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Password mismatch for user {}", user.id);
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    pub async fn register(&self, req: &RegistrationRequest) -> AppResult<User> {
        require_non_empty(&req.login, "登录名")?;
        require_non_empty(&req.password, "密码")?;
        require_non_empty(&req.reset_password, "重置密码")?;

        if self.store.find_user_by_login(&req.login).await?.is_some() {
            return Err(AppError::Conflict("用户已存在".to_string()));
        }

        let password_hash = hash_password(&req.password, self.cost)?;
        let reset_password_hash = hash_password(&req.reset_password, self.cost)?;

        // 并发注册同名用户时由唯一约束兜住，转换为 Conflict
        let user = self
            .store
            .create_user(&req.login, &password_hash, &reset_password_hash)
            .await?;
        tracing::info!("Registered user {} ({})", user.id, user.login);

        Ok(user)
    }

    pub async fn get(&self, id: i64) -> AppResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))
    }

    pub async fn find_by_login(&self, login: &str) -> AppResult<User> {
        self.store
            .find_user_by_login(login)
            .await?
            .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))
    }

    pub async fn update(&self, req: &UpdateUserRequest) -> AppResult<User> {
        require_non_empty(&req.login, "登录名")?;

        let password_hash = match req.password.as_deref() {
            Some(password) => {
                require_non_empty(password, "密码")?;
                Some(hash_password(password, self.cost)?)
            }
            None => None,
        };

        self.store
            .update_user(req.id, &req.login, password_hash.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> AppResult<User> {
        require_non_empty(&req.password, "密码")?;

        let Some(user) = self.store.find_user_by_login(&req.login).await? else {
            return self.unknown_login(&req.reset_password);
        };

        if !verify_password(&req.reset_password, &user.reset_password_hash)? {
            tracing::warn!("Invalid reset password for user {}", user.id);
            return Err(invalid_credentials());
        }

        let password_hash = hash_password(&req.password, self.cost)?;
        let user = self
            .store
            .update_user(user.id, &user.login, Some(&password_hash))
            .await?
            .ok_or_else(invalid_credentials)?;
        tracing::info!("Password reset for user {}", user.id);

        Ok(user)
    }
}
