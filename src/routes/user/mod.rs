mod handler;
mod model;

pub use handler::{
    find_by_login,
    get_user,
    login,
    refresh_token,
    register,
    reset_password,
    update_user
};
pub use model::Credentials;
