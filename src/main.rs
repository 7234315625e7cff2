use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use paddock_backend::config::Config;
use paddock_backend::db::postgres_account_repository::PostgresAccountRepository;
use paddock_backend::db::postgres_admin_unlock_repository::PostgresAdminUnlockRepository;
use paddock_backend::db::postgres_billing_event_repository::PostgresBillingEventRepository;
use paddock_backend::db::postgres_horse_repository::PostgresHorseRepository;
use paddock_backend::responses::JsonResponse;
use paddock_backend::routes::admin::{accounts, billing_events, unlock};
use paddock_backend::routes::{auth, billing, gate, horses, stripe};
use paddock_backend::services::smtp_mailer::smtp_impl::SmtpMailer;
use paddock_backend::services::stripe::LiveStripeService;
use paddock_backend::state::AppState;
use paddock_backend::utils::jwt::JwtKeys;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paddock_backend=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let jwt_keys = Arc::new(JwtKeys::from_env()?);

    // The pool is constructed here and handed to every repository; it is
    // closed explicitly after the server drains.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;
    info!("database ready");

    let state = AppState {
        accounts: Arc::new(PostgresAccountRepository { pool: pool.clone() }),
        billing_events: Arc::new(PostgresBillingEventRepository { pool: pool.clone() }),
        admin_unlock: Arc::new(PostgresAdminUnlockRepository { pool: pool.clone() }),
        horses: Arc::new(PostgresHorseRepository { pool: pool.clone() }),
        stripe: Arc::new(LiveStripeService::from_settings(&config.stripe)),
        mailer: Arc::new(SmtpMailer::new().context("failed to initialize mailer")?),
        config: config.clone(),
        jwt_keys,
    };

    let global_governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(200)
            .burst_size(20)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid global rate limiter configuration")?,
    );
    // Stricter limiter for credential endpoints.
    let auth_governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(10)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid auth rate limiter configuration")?,
    );
    let governor_limiter = global_governor.limiter().clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(60));
        governor_limiter.retain_recent();
    });

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup::signup))
        .route("/login", post(auth::login::login))
        .route("/logout", post(auth::logout::logout))
        .layer(GovernorLayer {
            config: auth_governor.clone(),
        });

    let billing_routes = Router::new()
        .route("/checkout", post(billing::create_checkout_session))
        .route("/portal", post(billing::create_portal_session))
        .route("/access", get(billing::account_access));

    let gated_routes = Router::new()
        .route(
            "/horses",
            get(horses::list_horses).post(horses::create_horse),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_subscription,
        ));

    // The unlock challenge itself sits outside the admin gate; everything
    // else under /api/admin requires role + live unlock session.
    let admin_unlock_routes = Router::new()
        .route("/unlock/challenge", post(unlock::unlock_challenge))
        .route("/unlock", post(unlock::submit_unlock))
        .route("/lock", post(unlock::lock_admin))
        .layer(GovernorLayer {
            config: auth_governor.clone(),
        });
    let admin_routes = Router::new()
        .route(
            "/billing-events",
            get(billing_events::list_billing_events),
        )
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts/{id}/suspend", post(accounts::suspend_account))
        .route(
            "/accounts/{id}/reinstate",
            post(accounts::reinstate_account),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_admin_unlock,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root))
        .route("/api/stripe/webhook", post(stripe::stripe_webhook))
        .nest("/api/auth", auth_routes)
        .nest("/api/billing", billing_routes)
        .nest("/api", gated_routes)
        .nest("/api/admin", admin_unlock_routes.merge(admin_routes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor.clone(),
        })
        .layer(cors);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .context("BIND_ADDR is not a valid socket address")?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "paddock backend listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    info!("database pool closed");
    Ok(())
}

async fn root() -> axum::response::Response {
    JsonResponse::success("Paddock API").into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
