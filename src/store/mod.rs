//! 持久化层。`Store` 在 Postgres 与 SQLite 实现之间分发，
//! 唯一性（登录名、好友边、成员关系、私聊双方）由数据库约束保证。

use chrono::{DateTime, Utc};

mod models;
mod postgres;
mod sqlite;

pub use models::{Chat, Message, User};
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

pub const SQLITE_URL_PREFIX: &str = "sqlite:";
pub const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),
    #[error("referenced row does not exist: {0}")]
    MissingReference(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

// 唯一约束与外键冲突交给调用方按业务含义处理
fn classify(e: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::UniqueViolation(what);
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingReference(what);
        }
    }
    StoreError::Database(e)
}

/// 私聊双方的无序键 `min:max`，群聊为 `None`。
/// chats.personal_pair 上的唯一约束保证同一对用户只有一个私聊。
fn personal_pair(personal: bool, members: &[i64]) -> Option<String> {
    if !personal {
        return None;
    }

    let mut ids = members.to_vec();
    ids.sort_unstable();
    ids.dedup();
    Some(
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(":"),
    )
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Sqlite(SqliteStore),
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            Store::Postgres(store) => store.$method($($arg),*).await,
            Store::Sqlite(store) => store.$method($($arg),*).await,
        }
    };
}

impl Store {
    /// `sqlite:` 开头的连接串使用 SQLite，其余按 Postgres 处理。两者都会执行迁移。
    pub async fn connect(url: &str) -> StoreResult<Self> {
        if url.starts_with(SQLITE_URL_PREFIX) {
            return Ok(Store::Sqlite(SqliteStore::connect(url).await?));
        }

        Ok(Store::Postgres(PgStore::connect(url).await?))
    }

    /// 进程内 SQLite 数据库，重启后数据丢失
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(SQLITE_MEMORY_URL).await
    }

    // 用户

    pub async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        reset_password_hash: &str,
    ) -> StoreResult<User> {
        dispatch!(self, create_user(login, password_hash, reset_password_hash))
    }

    pub async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        dispatch!(self, find_user(id))
    }

    pub async fn find_user_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        dispatch!(self, find_user_by_login(login))
    }

    pub async fn update_user(
        &self,
        id: i64,
        login: &str,
        password_hash: Option<&str>,
    ) -> StoreResult<Option<User>> {
        dispatch!(self, update_user(id, login, password_hash))
    }

    pub async fn count_existing_users(&self, ids: &[i64]) -> StoreResult<usize> {
        dispatch!(self, count_existing_users(ids))
    }

    // 好友

    pub async fn list_friends(&self, owner_id: i64) -> StoreResult<Vec<User>> {
        dispatch!(self, list_friends(owner_id))
    }

    pub async fn add_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<()> {
        dispatch!(self, add_friend(owner_id, friend_id))
    }

    pub async fn remove_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<bool> {
        dispatch!(self, remove_friend(owner_id, friend_id))
    }

    pub async fn is_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<bool> {
        dispatch!(self, is_friend(owner_id, friend_id))
    }

    // 聊天

    pub async fn create_chat(
        &self,
        owner_id: i64,
        name: &str,
        personal: bool,
        members: &[i64],
    ) -> StoreResult<Chat> {
        dispatch!(self, create_chat(owner_id, name, personal, members))
    }

    pub async fn find_chat(&self, id: i64) -> StoreResult<Option<Chat>> {
        dispatch!(self, find_chat(id))
    }

    pub async fn list_chats_for_user(&self, user_id: i64) -> StoreResult<Vec<Chat>> {
        dispatch!(self, list_chats_for_user(user_id))
    }

    pub async fn chat_members(&self, chat_id: i64) -> StoreResult<Vec<User>> {
        dispatch!(self, chat_members(chat_id))
    }

    pub async fn is_member(&self, chat_id: i64, user_id: i64) -> StoreResult<bool> {
        dispatch!(self, is_member(chat_id, user_id))
    }

    pub async fn remove_member(&self, chat_id: i64, user_id: i64) -> StoreResult<bool> {
        dispatch!(self, remove_member(chat_id, user_id))
    }

    pub async fn delete_chat(&self, chat_id: i64) -> StoreResult<bool> {
        dispatch!(self, delete_chat(chat_id))
    }

    pub async fn clear_messages(&self, chat_id: i64) -> StoreResult<u64> {
        dispatch!(self, clear_messages(chat_id))
    }

    // 消息

    pub async fn create_message(
        &self,
        chat_id: i64,
        user_id: i64,
        text: &str,
        expired_at: DateTime<Utc>,
    ) -> StoreResult<Message> {
        dispatch!(self, create_message(chat_id, user_id, text, expired_at))
    }

    pub async fn find_message(&self, id: i64) -> StoreResult<Option<Message>> {
        dispatch!(self, find_message(id))
    }

    pub async fn delete_message(&self, id: i64) -> StoreResult<bool> {
        dispatch!(self, delete_message(id))
    }

    /// 按 id 倒序（最新在前）分页。
    pub async fn list_messages(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        dispatch!(self, list_messages(chat_id, limit, offset))
    }

    pub async fn last_message_id(&self, chat_id: i64) -> StoreResult<i64> {
        dispatch!(self, last_message_id(chat_id))
    }
}
