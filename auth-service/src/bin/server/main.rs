use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use auth::Authenticator;
use auth_service::config::Config;
use auth_service::config::StoreKind;
use auth_service::inbound::http::middleware::AuthSettings;
use auth_service::inbound::http::router::create_router;
use auth_service::outbound::ldap::LdapUserStore;
use auth_service::outbound::memory::InMemoryUserStore;
use auth_service::user::ports::UserStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "auth-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        token_algorithm = ?config.token.algorithm,
        token_ttl_hours = config.token.ttl_hours,
        store = ?config.store.kind,
        error_format = ?config.errors.format,
        "Configuration loaded"
    );

    let codec = config.token.build_codec()?;
    tracing::info!(issuer = %codec.issuer(), "Token codec ready");
    let authenticator = Arc::new(Authenticator::new(codec, config.token.ttl()?));

    let user_store: Arc<dyn UserStore> = match config.store.kind {
        StoreKind::Memory => Arc::new(InMemoryUserStore::from_records(&config.store.users)),
        StoreKind::Ldap => {
            let ldap = config
                .store
                .ldap
                .clone()
                .context("store.kind is ldap but no [store.ldap] section is configured")?;
            Arc::new(LdapUserStore::from_config(ldap))
        }
    };

    let settings = AuthSettings::new(authenticator, Arc::clone(&user_store))
        .with_error_handler(config.errors.renderer().handler())
        .with_token_query_key(&config.token.query_key)
        .with_token_cookie(&config.token.cookie_name);

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(Arc::new(settings));
    let served = axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    user_store.close().await;

    match served {
        Ok(()) => tracing::info!("Server exited successfully"),
        Err(e) => tracing::error!(error = %e, "Server error"),
    };

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
