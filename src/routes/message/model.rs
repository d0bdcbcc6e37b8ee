use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    routes::chat::ChatAuthority,
    store::{Message, Store, StoreError},
};

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub chat_id: i64,
    pub text: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LastIdResponse {
    pub last_id: i64,
}

pub struct MessageGateway<'a> {
    store: &'a Store,
    ttl: Duration,
    page_limit: i64,
}

impl<'a> MessageGateway<'a> {
    pub fn new(store: &'a Store, ttl: Duration, page_limit: i64) -> Self {
        Self {
            store,
            ttl,
            page_limit,
        }
    }

    pub async fn create(&self, author_id: i64, chat_id: i64, text: &str) -> AppResult<Message> {
        if !ChatAuthority::new(self.store)
            .check_membership(chat_id, author_id)
            .await?
        {
            tracing::warn!("User {} tried to post into chat {}", author_id, chat_id);
            return Err(AppError::Forbidden("不是该聊天的成员".to_string()));
        }
        if text.trim().is_empty() {
            return Err(AppError::Validation("消息内容不能为空".to_string()));
        }

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|_| AppError::Internal("消息有效期配置错误".to_string()))?;
        let message = match self
            .store
            .create_message(chat_id, author_id, text, Utc::now() + ttl)
            .await
        {
            Ok(message) => message,
            // 校验通过后聊天被删除
            Err(StoreError::MissingReference(_)) => {
                return Err(AppError::NotFound("聊天不存在".to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Message {} stored in chat {}", message.id, chat_id);

        Ok(message)
    }

    pub async fn find(&self, id: i64) -> AppResult<Message> {
        self.store
            .find_message(id)
            .await?
            .ok_or_else(|| AppError::NotFound("消息不存在".to_string()))
    }

    pub async fn delete(&self, message: &Message, requester_id: i64) -> AppResult<()> {
        if message.user_id != requester_id {
            return Err(AppError::Forbidden("只能删除自己的消息".to_string()));
        }

        if !self.store.delete_message(message.id).await? {
            return Err(AppError::NotFound("消息不存在".to_string()));
        }

        Ok(())
    }

    /// 调用方需先确认成员身份。按 id 倒序，页码从 1 开始。
    pub async fn list_by_chat(&self, chat_id: i64, page: i64) -> AppResult<Vec<Message>> {
        if page < 1 {
            return Err(AppError::Validation("页码必须从1开始".to_string()));
        }

        let offset = (page - 1).saturating_mul(self.page_limit);
        Ok(self
            .store
            .list_messages(chat_id, self.page_limit, offset)
            .await?)
    }

    pub async fn last_id(&self, chat_id: i64) -> AppResult<i64> {
        Ok(self.store.last_message_id(chat_id).await?)
    }
}
