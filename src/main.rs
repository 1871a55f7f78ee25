use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use grandeur_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Auth, payment gateway and mailer collaborators
    let auth_service = Arc::new(api::auth::AuthService::new(
        &cfg.jwt_secret,
        cfg.jwt_expiration_secs,
    ));
    let gateway: Arc<dyn api::services::gateway::PaymentGateway> =
        Arc::new(api::services::gateway::FlutterwaveGateway::new(
            cfg.gateway_base_url.clone(),
            cfg.gateway_secret_key.clone(),
            Duration::from_secs(cfg.gateway_timeout_secs),
        ));
    let mailer = api::services::mailer::Mailer::from_config(&cfg).map(Arc::new);
    if mailer.is_none() {
        info!("SMTP relay not configured; verification mail disabled");
    }

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        Arc::new(event_sender.clone()),
        auth_service.clone(),
        gateway,
        mailer,
        cfg.clone(),
    );

    let app_state = Arc::new(api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
    });

    // Build CORS layer from config
    let cors_layer = match cfg.cors_allowed_origins.as_deref() {
        Some(raw) => {
            let origins: Vec<HeaderValue> = raw
                .split(',')
                .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let app = Router::new()
        .route("/", get(|| async { "grandeur-api up" }))
        .merge(api::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Make the AuthService reachable from the auth extractors
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<
                Arc<api::auth::AuthService>,
            >,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::new(cfg.host.parse()?, cfg.port);
    info!("grandeur-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
