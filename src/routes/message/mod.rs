mod handler;
mod model;

pub use handler::{create_message, delete_message, last_message_id, list_messages};
pub use model::MessageGateway;
