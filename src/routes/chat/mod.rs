mod handler;
mod model;

pub use handler::{clean_chat, create_chat, delete_chat, exit_chat, get_chat, list_chats};
pub use model::{ChatAuthority, ChatInfo};
