use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    store::{Store, StoreError, User},
};

#[derive(Debug, Deserialize)]
pub struct AddFriendRequest {
    pub login: String,
}

/// 单向好友关系：A 添加 B 不代表 B 也添加了 A。
pub struct FriendGraph<'a> {
    store: &'a Store,
}

impl<'a> FriendGraph<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: i64) -> AppResult<Vec<User>> {
        Ok(self.store.list_friends(user_id).await?)
    }

    pub async fn is_friend(&self, owner_id: i64, friend_id: i64) -> AppResult<bool> {
        Ok(self.store.is_friend(owner_id, friend_id).await?)
    }

    pub async fn add(&self, owner_id: i64, friend_login: &str) -> AppResult<User> {
        let friend = self
            .store
            .find_user_by_login(friend_login)
            .await?
            .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;

        if friend.id == owner_id {
            return Err(AppError::Validation("不能添加自己为好友".to_string()));
        }
        if self.store.is_friend(owner_id, friend.id).await? {
            return Err(AppError::Conflict("已经是好友".to_string()));
        }

        // 检查与插入之间的竞争由 (owner_id, friend_id) 唯一约束处理
        match self.store.add_friend(owner_id, friend.id).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AppError::Conflict("已经是好友".to_string()));
            }
            Err(StoreError::MissingReference(_)) => {
                return Err(AppError::NotFound("用户不存在".to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!("User {} added friend {}", owner_id, friend.id);

        Ok(friend)
    }

    pub async fn remove(&self, owner_id: i64, friend_id: i64) -> AppResult<()> {
        if !self.store.remove_friend(owner_id, friend_id).await? {
            return Err(AppError::NotFound("好友关系不存在".to_string()));
        }
        tracing::info!("User {} removed friend {}", owner_id, friend_id);

        Ok(())
    }
}
