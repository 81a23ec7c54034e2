mod auth;
mod health_check;

pub use auth::{
    authenticate_two_fa, get_current_user, get_two_fa_qr_code, get_two_fa_status, login, logout,
    refresh, register, toggle_two_fa,
};
pub use health_check::health_check;
