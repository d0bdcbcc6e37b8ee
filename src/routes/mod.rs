pub mod chat;
pub mod friend;
pub mod message;
pub mod user;
