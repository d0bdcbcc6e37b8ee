use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    store::{Chat, Store, StoreError, User},
};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub personal: bool,
    #[serde(default, alias = "owner")]
    pub owner_id: Option<i64>,
    pub members: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncludeQuery {
    pub include: Option<String>,
}

impl IncludeQuery {
    /// `include=users` 或逗号分隔的列表中包含 users
    pub fn users(&self) -> bool {
        self.include
            .as_deref()
            .map(|list| list.split(',').any(|item| item.trim() == "users"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatInfo {
    #[serde(flatten)]
    pub chat: Chat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

/// 聊天与成员关系的唯一授权入口。
///
/// 所有针对已存在聊天的读写都先经过 [`ChatAuthority::authorize`]：
/// 聊天不存在返回 `NotFound`，调用者不是成员返回 `Forbidden`，
/// 检查通过之前不做任何修改。
///
/// 私聊（`personal`）只能由创建者删除；群聊没有删除路径，
/// 最后一个成员退出后聊天依旧保留。
pub struct ChatAuthority<'a> {
    store: &'a Store,
}

impl<'a> ChatAuthority<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create_chat(
        &self,
        initiator_id: i64,
        name: &str,
        personal: bool,
        member_ids: &[i64],
    ) -> AppResult<ChatInfo> {
        let mut members = member_ids.to_vec();
        members.sort_unstable();
        members.dedup();

        if !members.contains(&initiator_id) {
            return Err(AppError::Validation("创建者必须是聊天成员".to_string()));
        }
        if personal && members.len() != 2 {
            return Err(AppError::Conflict("私聊必须恰好有两名成员".to_string()));
        }
        if self.store.count_existing_users(&members).await? != members.len() {
            return Err(AppError::Validation("成员中包含不存在的用户".to_string()));
        }

        let chat = match self
            .store
            .create_chat(initiator_id, name, personal, &members)
            .await
        {
            Ok(chat) => chat,
            Err(StoreError::MissingReference(_)) => {
                return Err(AppError::Validation("成员中包含不存在的用户".to_string()));
            }
            // chats.personal_pair 唯一约束，并发创建时也只有一个成功
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AppError::Conflict("两人之间已有私聊".to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            "User {} created chat {} (personal: {}, members: {})",
            initiator_id,
            chat.id,
            chat.personal,
            members.len()
        );

        let users = self.store.chat_members(chat.id).await?;
        Ok(ChatInfo {
            chat,
            users: Some(users),
        })
    }

    pub async fn get_chat(&self, id: i64, include_members: bool) -> AppResult<ChatInfo> {
        let chat = self.find(id).await?;
        let users = if include_members {
            Some(self.store.chat_members(chat.id).await?)
        } else {
            None
        };

        Ok(ChatInfo { chat, users })
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Chat>> {
        Ok(self.store.list_chats_for_user(user_id).await?)
    }

    pub async fn check_membership(&self, chat_id: i64, user_id: i64) -> AppResult<bool> {
        Ok(self.store.is_member(chat_id, user_id).await?)
    }

    /// 加载聊天并确认调用者是成员
    pub async fn authorize(&self, chat_id: i64, user_id: i64) -> AppResult<Chat> {
        let chat = self.find(chat_id).await?;

        if !self.check_membership(chat.id, user_id).await? {
            tracing::warn!("User {} is not a member of chat {}", user_id, chat.id);
            return Err(AppError::Forbidden("不是该聊天的成员".to_string()));
        }

        Ok(chat)
    }

    pub async fn delete_chat(&self, chat: &Chat, requester_id: i64) -> AppResult<()> {
        if !chat.personal || chat.owner_id != requester_id {
            return Err(AppError::Forbidden("只有私聊的创建者可以删除聊天".to_string()));
        }

        if !self.store.delete_chat(chat.id).await? {
            return Err(AppError::NotFound("聊天不存在".to_string()));
        }
        tracing::info!("User {} deleted chat {}", requester_id, chat.id);

        Ok(())
    }

    pub async fn exit_chat(&self, chat: &Chat, requester_id: i64) -> AppResult<()> {
        // TODO: 最后一名成员退出后群聊仍然保留，是否需要自动清理待定
        if !self.store.remove_member(chat.id, requester_id).await? {
            return Err(AppError::Forbidden("不是该聊天的成员".to_string()));
        }
        tracing::info!("User {} left chat {}", requester_id, chat.id);

        Ok(())
    }

    pub async fn clean_chat(&self, chat: &Chat, requester_id: i64) -> AppResult<u64> {
        if !self.check_membership(chat.id, requester_id).await? {
            return Err(AppError::Forbidden("不是该聊天的成员".to_string()));
        }

        let removed = self.store.clear_messages(chat.id).await?;
        tracing::info!(
            "User {} cleaned chat {} ({} messages removed)",
            requester_id,
            chat.id,
            removed
        );

        Ok(removed)
    }

    async fn find(&self, id: i64) -> AppResult<Chat> {
        self.store
            .find_chat(id)
            .await?
            .ok_or_else(|| AppError::NotFound("聊天不存在".to_string()))
    }
}
