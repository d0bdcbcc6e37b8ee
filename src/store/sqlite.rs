use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::{Chat, Message, StoreResult, User, classify, personal_pair};

const USER_COLUMNS: &str = "id, login, password_hash, reset_password_hash, created_at, updated_at";
const CHAT_COLUMNS: &str = "id, owner_id, name, personal, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, chat_id, user_id, text, is_read, created_at, updated_at, expired_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

// json_each 用的 id 数组
fn id_list(ids: &[i64]) -> String {
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", ids.join(","))
}

impl SqliteStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // 内存库只存在于单个连接上，连接不能被回收
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        if in_memory {
            tracing::warn!("Using in-memory SQLite store, data will not survive restarts");
        } else {
            tracing::info!("SQLite store ready, migrations applied");
        }

        Ok(Self { pool })
    }

    pub async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        reset_password_hash: &str,
    ) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (login, password_hash, reset_password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .bind(password_hash)
            .bind(reset_password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "登录名"))
    }

    pub async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_user_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE login = ?1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn update_user(
        &self,
        id: i64,
        login: &str,
        password_hash: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let query = format!(
            "UPDATE users
             SET login = ?2,
                 password_hash = COALESCE(?3, password_hash),
                 updated_at = ?4
             WHERE id = ?1
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(login)
            .bind(password_hash)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "登录名"))
    }

    pub async fn count_existing_users(&self, ids: &[i64]) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE id IN (SELECT value FROM json_each(?1))",
        )
        .bind(id_list(ids))
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    pub async fn list_friends(&self, owner_id: i64) -> StoreResult<Vec<User>> {
        let query = "SELECT u.id, u.login, u.password_hash, u.reset_password_hash, u.created_at, u.updated_at
             FROM friends f
             JOIN users u ON u.id = f.friend_id
             WHERE f.owner_id = ?1
             ORDER BY f.rowid";

        Ok(sqlx::query_as::<_, User>(query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn add_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO friends (owner_id, friend_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(owner_id)
            .bind(friend_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "好友"))?;

        Ok(())
    }

    pub async fn remove_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM friends WHERE owner_id = ?1 AND friend_id = ?2")
            .bind(owner_id)
            .bind(friend_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_friend(&self, owner_id: i64, friend_id: i64) -> StoreResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM friends WHERE owner_id = ?1 AND friend_id = ?2)",
        )
        .bind(owner_id)
        .bind(friend_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found != 0)
    }

    pub async fn create_chat(
        &self,
        owner_id: i64,
        name: &str,
        personal: bool,
        members: &[i64],
    ) -> StoreResult<Chat> {
        // 聊天与成员在同一事务中写入
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO chats (owner_id, name, personal, personal_pair, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {CHAT_COLUMNS}"
        );
        let chat = sqlx::query_as::<_, Chat>(&query)
            .bind(owner_id)
            .bind(name)
            .bind(personal)
            .bind(personal_pair(personal, members))
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify(e, "私聊"))?;

        sqlx::query(
            "INSERT INTO chat_users (chat_id, user_id)
             SELECT ?1, value FROM json_each(?2)",
        )
        .bind(chat.id)
        .bind(id_list(members))
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "成员"))?;

        tx.commit().await?;

        Ok(chat)
    }

    pub async fn find_chat(&self, id: i64) -> StoreResult<Option<Chat>> {
        let query = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1");

        Ok(sqlx::query_as::<_, Chat>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_chats_for_user(&self, user_id: i64) -> StoreResult<Vec<Chat>> {
        let query = "SELECT c.id, c.owner_id, c.name, c.personal, c.created_at, c.updated_at
             FROM chats c
             JOIN chat_users cu ON cu.chat_id = c.id
             WHERE cu.user_id = ?1
             ORDER BY c.id";

        Ok(sqlx::query_as::<_, Chat>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn chat_members(&self, chat_id: i64) -> StoreResult<Vec<User>> {
        let query = "SELECT u.id, u.login, u.password_hash, u.reset_password_hash, u.created_at, u.updated_at
             FROM chat_users cu
             JOIN users u ON u.id = cu.user_id
             WHERE cu.chat_id = ?1
             ORDER BY u.id";

        Ok(sqlx::query_as::<_, User>(query)
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn is_member(&self, chat_id: i64, user_id: i64) -> StoreResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_users WHERE chat_id = ?1 AND user_id = ?2)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found != 0)
    }

    pub async fn remove_member(&self, chat_id: i64, user_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM chat_users WHERE chat_id = ?1 AND user_id = ?2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_chat(&self, chat_id: i64) -> StoreResult<bool> {
        // 依赖 foreign_keys = ON 触发级联删除
        let result = sqlx::query("DELETE FROM chats WHERE id = ?1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_messages(&self, chat_id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE chat_id = ?1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_message(
        &self,
        chat_id: i64,
        user_id: i64,
        text: &str,
        expired_at: DateTime<Utc>,
    ) -> StoreResult<Message> {
        let query = format!(
            "INSERT INTO messages (chat_id, user_id, text, created_at, updated_at, expired_at)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5)
             RETURNING {MESSAGE_COLUMNS}"
        );

        sqlx::query_as::<_, Message>(&query)
            .bind(chat_id)
            .bind(user_id)
            .bind(text)
            .bind(Utc::now())
            .bind(expired_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "聊天"))
    }

    pub async fn find_message(&self, id: i64) -> StoreResult<Option<Message>> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");

        Ok(sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn delete_message(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_messages(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE chat_id = ?1
             ORDER BY id DESC
             LIMIT ?2 OFFSET ?3"
        );

        Ok(sqlx::query_as::<_, Message>(&query)
            .bind(chat_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn last_message_id(&self, chat_id: i64) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM messages WHERE chat_id = ?1")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_is_a_json_array() {
        assert_eq!(id_list(&[]), "[]");
        assert_eq!(id_list(&[1, 22, 3]), "[1,22,3]");
    }
}
