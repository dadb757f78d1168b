use crate::components::posts::{InMemoryPostStore, PostStore, RedisPostStore};
use crate::components::CalendarFeedHandle;
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use crate::utils::time::SystemClock;
use crate::web::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Pick the post store: Redis when configured and reachable, memory otherwise
pub async fn connect_post_store(config: &Config) -> Arc<dyn PostStore> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set, using in-memory post store");
        return Arc::new(InMemoryPostStore::new());
    };

    let store = match RedisPostStore::new(redis_url, &config.posts_key) {
        Ok(store) => store,
        Err(e) => {
            warn!("Invalid Redis configuration ({}), using in-memory post store", e);
            return Arc::new(InMemoryPostStore::new());
        }
    };

    match store.ping().await {
        Ok(()) => {
            info!("Connected to Redis successfully");
            Arc::new(store)
        }
        Err(e) => {
            // Log the error and fall back to an empty in-memory store
            error!("Failed to connect to Redis: {}", e);
            info!("Using in-memory post store as fallback");
            Arc::new(InMemoryPostStore::new())
        }
    }
}

/// Start the feed actor and serve the API until a shutdown signal arrives
pub async fn start_server(config: Config) -> miette::Result<()> {
    let feed = CalendarFeedHandle::new(&config)?;
    let calendar_host = url::Url::parse(&config.calendar_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    info!(
        "Serving calendar from {} in {} (past events: {:?}, parsing: {:?})",
        calendar_host, config.timezone, config.past_event_policy, config.parse_mode
    );
    if config.api_key.is_none() {
        warn!("API_KEY not set, API routes are unauthenticated");
    }

    let posts = connect_post_store(&config).await;

    let state = AppState::new(&config, Arc::new(feed.clone()), posts, Arc::new(SystemClock));
    let app = web::router(state);

    // Bind to address and run server
    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::from)?;
    info!("Listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await;

    // Stop the feed actor after the server has drained
    if let Err(e) = feed.shutdown().await {
        error!("Error shutting down calendar feed: {:?}", e);
    } else {
        info!("Calendar feed shut down successfully");
    }

    result.map_err(|e| Error::Io(e).into())
}
