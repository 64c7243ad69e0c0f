use crate::{
    api::{self, AuthConfig},
    cli::commands::store::Backend,
    store::{MemoryStore, PgStore, SharedStore},
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: Backend,
    pub dsn: Option<SecretString>,
    pub max_connections: u32,
    pub session_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub login_path: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: SharedStore = match args.backend {
        Backend::Memory => {
            warn!("Using the in-memory store; all data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        Backend::Postgres => {
            let dsn = args
                .dsn
                .as_ref()
                .ok_or_else(|| anyhow!("missing required argument: --dsn"))?;

            info!("Connecting to {}", redact_dsn(dsn.expose_secret())?);

            let store = PgStore::connect(dsn.expose_secret(), args.max_connections)
                .await
                .context("Failed to connect to database")?;
            store
                .migrate()
                .await
                .context("Failed to apply database schema")?;
            Arc::new(store)
        }
    };

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.cookie_secure)
        .with_login_path(args.login_path);

    api::new(args.port, store, auth_config).await
}

/// DSN safe for logs: the password, if any, is masked.
fn redact_dsn(dsn: &str) -> Result<String> {
    let mut url = Url::parse(dsn).context("Invalid database connection string")?;
    if url.password().is_some() {
        url.set_password(Some("*****"))
            .map_err(|()| anyhow!("Error redacting password"))?;
    }
    Ok(url.to_string())
}
