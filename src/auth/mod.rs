/// Authentication module
///
/// Token generation and validation, password hashing, the bounded refresh
/// token store, two-factor management, and the session flows composing them.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod session;
mod two_factor;
mod users;

pub use claims::{Claims, RefreshClaims};
pub use credentials::verify_credentials;
pub use jwt::{
    generate_access_token, generate_refresh_token, validate_access_token,
    validate_refresh_token,
};
pub use password::{hash_password, verify_password};
pub use refresh_token::{is_refresh_token_stored, revoke_refresh_token, save_refresh_token};
pub use session::{
    continue_with_two_factor, login, logout, refresh, register, AuthenticatedSession,
    LoginOutcome,
};
pub use two_factor::{
    disable as disable_two_fa, enable_or_fetch as enable_two_fa, qr_code_png, two_fa_status,
    validate_code as validate_two_fa_code, TwoFaData, TwoFaStatus,
};
pub use users::{find_user_by_id, User};
