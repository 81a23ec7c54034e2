use actix_web::{middleware::Logger, web, App, HttpServer};
use actix_files as fs;
use sqlx::PgPool;
use std::net::TcpListener;
use actix_web::dev::Server;

use crate::configuration::Settings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    authenticate_two_fa, get_current_user, get_two_fa_qr_code, get_two_fa_status, health_check,
    login, logout, refresh, register, toggle_two_fa,
};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let settings_data = web::Data::new(settings.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())      // Standard logging
            .wrap(LoggerMiddleware)       // Custom logging

            // Shared state
            .app_data(connection.clone())
            .app_data(settings_data.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::delete().to(logout))
            // Accepts the partial token from the login step; must stay
            // outside the JWT middleware
            .route(
                "/auth/2fa/authenticate/{code}",
                web::post().to(authenticate_two_fa),
            )

            // Protected routes (require a fully authenticated session)
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(settings.jwt.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/2fa/status", web::get().to(get_two_fa_status))
                    .route("/2fa/toggle/{enabled}", web::post().to(toggle_two_fa))
                    .route("/2fa/qr-code", web::get().to(get_two_fa_qr_code)),
            )

            // Static file serving (must be last to not override API routes)
            .service(fs::Files::new("/", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
