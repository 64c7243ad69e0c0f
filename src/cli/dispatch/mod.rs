//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to run, such as starting the
//! API server with its store and session configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, store, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let store_opts = store::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        backend: store_opts.backend,
        dsn: store_opts.dsn,
        max_connections: store_opts.max_connections,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        cookie_secure: auth_opts.cookie_secure,
        login_path: auth_opts.login_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::store::Backend;

    #[test]
    fn dsn_required_for_postgres() {
        temp_env::with_vars(
            [
                ("POSTLINE_DSN", None::<&str>),
                ("POSTLINE_STORE", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["postline"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("missing required argument: --dsn"));
                }
            },
        );
    }

    #[test]
    fn memory_server_action() {
        temp_env::with_vars(
            [
                ("POSTLINE_DSN", None::<&str>),
                ("POSTLINE_SESSION_TTL_SECONDS", None::<&str>),
                ("POSTLINE_LOGIN_PATH", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "postline",
                    "--store",
                    "memory",
                    "-p",
                    "9000",
                    "--login-path",
                    "/signin",
                ]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 9000);
                    assert_eq!(args.backend, Backend::Memory);
                    assert!(args.dsn.is_none());
                    assert_eq!(args.session_ttl_seconds, 86_400);
                    assert_eq!(args.login_path, "/signin");
                }
            },
        );
    }
}
