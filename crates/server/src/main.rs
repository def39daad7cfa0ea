//! livepoll server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use livepoll_api::{
    SseBroadcaster, SseEvent,
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use livepoll_common::Config;
use livepoll_core::services::{
    EventPublisherService, NotificationService, PollService, UserService,
};
use livepoll_db::repositories::{
    PollRepository, ScoreRepository, UserRepository, VoteRecordRepository,
};
use livepoll_queue::{PubSubEvent, RedisPubSub};
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Map a change feed event onto the coarse client-facing invalidation.
fn to_sse_event(event: &PubSubEvent) -> SseEvent {
    match event {
        PubSubEvent::PollCreated { id }
        | PubSubEvent::PollUpdated { id }
        | PubSubEvent::PollDeleted { id } => SseEvent::PollsInvalidated { poll_id: Some(*id) },
        PubSubEvent::ScoreUpdated { user_id } => SseEvent::ScoresInvalidated {
            user_id: user_id.clone(),
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livepoll=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting livepoll server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and apply schema
    let db = Arc::new(livepoll_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    livepoll_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect the change feed
    let pubsub = Arc::new(RedisPubSub::new(&config.redis.url).await?);
    pubsub.start().await?;

    // Repositories
    let user_repo = UserRepository::new(db.clone());
    let poll_repo = PollRepository::new(db.clone());
    let vote_repo = VoteRecordRepository::new(db.clone());
    let score_repo = ScoreRepository::new(db.clone());

    // Services
    let events: EventPublisherService = pubsub.clone();
    let notifier = NotificationService::new(&config.notify);
    let user_service = UserService::new(user_repo.clone());
    let poll_service = PollService::new(
        poll_repo, vote_repo, score_repo, user_repo, notifier, events,
    );

    let sse_broadcaster = SseBroadcaster::new();

    // Bridge the change feed into the SSE hub
    {
        let mut rx = pubsub.subscribe_local();
        let broadcaster = sse_broadcaster.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => broadcaster.send(to_sse_event(&event)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed bridge lagged, forcing resync");
                        broadcaster.send(SseEvent::PollsInvalidated { poll_id: None });
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Change feed bridge closed");
                        break;
                    }
                }
            }
        });
    }

    let state = AppState {
        user_service,
        poll_service,
        sse_broadcaster,
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pubsub.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
