//! 存储层契约测试。默认跑 SQLite 内存库；
//! Postgres 版本需要 DATABASE_URL：`cargo test --test store -- --ignored`。

use chatter::store::{PgStore, Store, StoreError, User};
use chrono::Utc;

async fn with_users(store: &Store, logins: &[&str]) -> Vec<User> {
    let mut users = Vec::new();
    for login in logins {
        users.push(store.create_user(login, "h", "r").await.unwrap());
    }
    users
}

async fn login_is_unique(store: Store) {
    with_users(&store, &["a"]).await;

    let err = store.create_user("a", "h", "r").await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
}

async fn update_keeps_hash_unless_given(store: Store) {
    let users = with_users(&store, &["a", "b"]).await;
    let a = &users[0];

    let renamed = store.update_user(a.id, "alice", None).await.unwrap().unwrap();
    assert_eq!(renamed.login, "alice");
    assert_eq!(renamed.password_hash, a.password_hash);

    let rehashed = store
        .update_user(a.id, "alice", Some("new"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rehashed.password_hash, "new");

    assert!(matches!(
        store.update_user(a.id, "b", None).await,
        Err(StoreError::UniqueViolation(_))
    ));
    assert!(store.update_user(999, "x", None).await.unwrap().is_none());
}

async fn counts_only_existing_users(store: Store) {
    let users = with_users(&store, &["a", "b"]).await;
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    assert_eq!(store.count_existing_users(&ids).await.unwrap(), 2);
    assert_eq!(
        store.count_existing_users(&[ids[0], 999]).await.unwrap(),
        1
    );
    assert_eq!(store.count_existing_users(&[]).await.unwrap(), 0);
}

async fn friend_edges_are_directed_and_unique(store: Store) {
    let users = with_users(&store, &["a", "b", "c"]).await;
    let (a, b, c) = (users[0].id, users[1].id, users[2].id);

    store.add_friend(a, c).await.unwrap();
    store.add_friend(a, b).await.unwrap();
    assert!(matches!(
        store.add_friend(a, b).await,
        Err(StoreError::UniqueViolation(_))
    ));
    assert!(matches!(
        store.add_friend(a, 999).await,
        Err(StoreError::MissingReference(_))
    ));

    assert!(store.is_friend(a, b).await.unwrap());
    assert!(!store.is_friend(b, a).await.unwrap());
    let logins: Vec<String> = store
        .list_friends(a)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.login)
        .collect();
    assert_eq!(logins, ["c", "b"]);
    assert!(store.list_friends(b).await.unwrap().is_empty());

    assert!(store.remove_friend(a, b).await.unwrap());
    assert!(!store.remove_friend(a, b).await.unwrap());
}

async fn chat_with_unknown_member_leaves_no_rows(store: Store) {
    let users = with_users(&store, &["a"]).await;
    let a = users[0].id;

    let err = store.create_chat(a, "x", false, &[a, 999]).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingReference(_)));
    assert!(store.list_chats_for_user(a).await.unwrap().is_empty());
}

async fn personal_pair_is_unique(store: Store) {
    let users = with_users(&store, &["a", "b"]).await;
    let (a, b) = (users[0].id, users[1].id);

    let chat = store.create_chat(a, "", true, &[a, b]).await.unwrap();
    assert!(chat.personal);
    assert!(matches!(
        store.create_chat(b, "", true, &[b, a]).await,
        Err(StoreError::UniqueViolation(_))
    ));
    // 失败的事务不留下成员行
    assert_eq!(store.list_chats_for_user(b).await.unwrap().len(), 1);

    store.create_chat(a, "", false, &[a, b]).await.unwrap();
    assert!(store.delete_chat(chat.id).await.unwrap());
    store.create_chat(b, "", true, &[a, b]).await.unwrap();
}

async fn delete_chat_cascades(store: Store) {
    let users = with_users(&store, &["a", "b"]).await;
    let (a, b) = (users[0].id, users[1].id);
    let chat = store.create_chat(a, "ab", true, &[a, b]).await.unwrap();
    let message = store
        .create_message(chat.id, a, "hi", Utc::now())
        .await
        .unwrap();

    assert!(store.delete_chat(chat.id).await.unwrap());
    assert!(!store.delete_chat(chat.id).await.unwrap());
    assert!(store.find_chat(chat.id).await.unwrap().is_none());
    assert!(!store.is_member(chat.id, b).await.unwrap());
    assert!(store.find_message(message.id).await.unwrap().is_none());
}

async fn members_and_messages(store: Store) {
    let users = with_users(&store, &["a", "b"]).await;
    let (a, b) = (users[0].id, users[1].id);
    let chat = store.create_chat(a, "g", false, &[b, a]).await.unwrap();

    let members: Vec<i64> = store
        .chat_members(chat.id)
        .await
        .unwrap()
        .iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(members, [a, b]);

    let expires = Utc::now() + chrono::Duration::hours(1);
    let message = store.create_message(chat.id, b, "hi", expires).await.unwrap();
    assert!(!message.is_read);
    assert_eq!(message.expired_at.timestamp(), expires.timestamp());
    assert!(matches!(
        store.create_message(999, b, "hi", expires).await,
        Err(StoreError::MissingReference(_))
    ));

    assert!(store.remove_member(chat.id, b).await.unwrap());
    assert!(!store.remove_member(chat.id, b).await.unwrap());
    assert_eq!(store.find_message(message.id).await.unwrap().unwrap().text, "hi");
    assert_eq!(store.clear_messages(chat.id).await.unwrap(), 1);
    assert!(store.find_chat(chat.id).await.unwrap().is_some());
}

async fn messages_page_newest_first(store: Store) {
    let users = with_users(&store, &["a"]).await;
    let a = users[0].id;
    let chat = store.create_chat(a, "solo", false, &[a]).await.unwrap();
    assert_eq!(store.last_message_id(chat.id).await.unwrap(), 0);

    let mut last = 0;
    for i in 0..5 {
        last = store
            .create_message(chat.id, a, &format!("m{}", i), Utc::now())
            .await
            .unwrap()
            .id;
    }

    let page = store.list_messages(chat.id, 2, 0).await.unwrap();
    assert_eq!(
        page.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(),
        ["m4", "m3"]
    );
    let page = store.list_messages(chat.id, 2, 4).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "m0");
    assert_eq!(store.last_message_id(chat.id).await.unwrap(), last);

    assert!(store.delete_message(last).await.unwrap());
    assert!(!store.delete_message(last).await.unwrap());
}

macro_rules! store_tests {
    ($($name:ident),* $(,)?) => {
        mod sqlite {
            use super::*;

            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(Store::in_memory().await.unwrap()).await;
                }
            )*
        }

        mod postgres {
            use super::*;

            $(
                #[sqlx::test(migrations = "./migrations/postgres")]
                #[ignore = "needs a Postgres DATABASE_URL"]
                async fn $name(pool: sqlx::PgPool) {
                    super::$name(Store::Postgres(PgStore::from_pool(pool))).await;
                }
            )*
        }
    };
}

store_tests!(
    login_is_unique,
    update_keeps_hash_unless_given,
    counts_only_existing_users,
    friend_edges_are_directed_and_unique,
    chat_with_unknown_member_leaves_no_rows,
    personal_pair_is_unique,
    delete_chat_cascades,
    members_and_messages,
    messages_page_newest_first,
);
