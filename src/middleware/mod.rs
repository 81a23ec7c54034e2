/// Middleware module
///
/// Custom middleware for authentication and request handling.

mod jwt_middleware;

pub use jwt_middleware::{JwtMiddleware, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
