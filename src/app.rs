use crate::asaas::AsaasClient;
use crate::config::Config;
use crate::state::AppState;
use crate::supabase::SupabaseAuth;
use crate::utils::fmt_duration;
use crate::web::auth::session::SessionCache;
use crate::web::create_router;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// How often expired sessions are swept from the cache.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Connect to the database, run migrations and build shared clients.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let slow_threshold = Duration::from_millis(500);

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(8)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect(&config.database_url)
            .await
            .context("Failed to create database pool")?;

        info!(
            min_connections = 0,
            max_connections = 8,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            acquire_slow_threshold = fmt_duration(slow_threshold),
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");

        let asaas = AsaasClient::new(
            &config.asaas_sandbox_url,
            &config.asaas_prod_url,
            config.asaas_requests_per_second,
            config.asaas_timeout,
        )
        .context("Failed to create Asaas client")?;

        let auth = SupabaseAuth::new(&config.supabase_url, &config.supabase_anon_key)
            .context("Failed to create auth client")?;

        let session_cache = SessionCache::new(config.session_ttl);
        session_cache.spawn_purge(SESSION_PURGE_INTERVAL);

        // Seed the initial admin if configured. The profile only exists after a first login.
        if let Some(email) = config.admin_email.as_deref() {
            let seeded = crate::data::roles::ensure_seed_admin(&db_pool, email)
                .await
                .context("Failed to seed admin user")?;
            if seeded {
                info!(email, "Seed admin ensured");
            } else {
                warn!(email, "Seed admin has no profile yet; sign in once and restart");
            }
        }

        let app_state = AppState::new(db_pool, Arc::new(asaas), Arc::new(auth), session_cache);

        Ok(App { config, app_state })
    }

    /// Serve until a shutdown signal arrives, then drain within `shutdown_timeout`.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, %addr, "Failed to bind listener");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web server listening");

        let router = create_router(self.app_state);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let server = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        })
        .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(e) => {
                        error!(error = %e, "web server exited unexpectedly");
                        ExitCode::FAILURE
                    }
                };
            }
            signal = shutdown_signal() => {
                info!(signal, "shutdown requested, draining connections");
            }
        }

        let _ = shutdown_tx.send(true);
        let timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(timeout, &mut server).await {
            Ok(Ok(())) => {
                info!("graceful shutdown complete");
                ExitCode::SUCCESS
            }
            Ok(Err(e)) => {
                error!(error = %e, "web server failed while draining");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(
                    timeout = fmt_duration(timeout),
                    "shutdown timed out with requests still in flight"
                );
                ExitCode::FAILURE
            }
        }
    }
}

/// Resolve on ctrl-c or SIGTERM, naming the signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "ctrl-c",
        _ = terminate => "SIGTERM",
    }
}
