//! Webtoon client
//!
//! Resolves one route against the local catalog and the configured stores and
//! prints the resulting view state as JSON.

use webtoon_client::auth::User;
use webtoon_client::config::Config;
use webtoon_client::views::{self, Route};
use webtoon_client::{init_tracing, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Starting webtoon client");
    tracing::info!("Catalog directory: {:?}", config.catalog_dir);
    tracing::info!("Storage directory: {:?}", config.storage_dir);

    let path = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());
    let route = Route::parse(&path);

    let state = AppState::init(config).await?;

    // A session obtained from the external sign-in flow, as JSON.
    if let Ok(raw) = std::env::var("WEBTOON_SESSION") {
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => state.session.sign_in(user),
            Err(e) => tracing::warn!("Ignoring malformed WEBTOON_SESSION: {}", e),
        }
    }

    let page = views::render(&state, &route).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}
