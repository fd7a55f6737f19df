mod analyze_payload;
mod page;
mod routes;
mod state;

use state::AppState;
use std::env;

#[tokio::main]
async fn main() {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let state = match AppState::from_env() {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to initialize analysis service: {:#}", e);
            eprintln!("Failed to initialize analysis service: {:#}", e);
            std::process::exit(1);
        }
    };

    let app = routes::create_router(state);

    let bind = env::var("ADVISOR_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", bind, e);
            std::process::exit(1);
        }
    };

    log::info!("Listening on {}", bind);
    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
