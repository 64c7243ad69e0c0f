use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::{fmt, str::FromStr};

pub const ARG_STORE: &str = "store";
pub const ARG_DSN: &str = "dsn";
pub const ARG_MAX_CONNECTIONS: &str = "max-connections";

/// Which [`crate::store::Store`] backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug)]
pub struct Options {
    pub backend: Backend,
    pub dsn: Option<SecretString>,
    pub max_connections: u32,
}

impl Options {
    /// Parse store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Postgres backend is selected without a DSN.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let backend = matches
            .get_one::<String>(ARG_STORE)
            .map_or(Ok(Backend::Postgres), |value| value.parse())
            .map_err(|e| anyhow::anyhow!(e))?;

        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let dsn = matches
            .get_one::<String>(ARG_DSN)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        if backend == Backend::Postgres && dsn.is_none() {
            anyhow::bail!("missing required argument: --{ARG_DSN}");
        }

        Ok(Self {
            backend,
            dsn: dsn.map(SecretString::from),
            max_connections: matches
                .get_one::<u32>(ARG_MAX_CONNECTIONS)
                .copied()
                .unwrap_or(5),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORE)
                .long(ARG_STORE)
                .help("Storage backend")
                .env("POSTLINE_STORE")
                .default_value("postgres")
                .value_parser(["postgres", "memory"]),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help("Database connection string. Required unless --store memory is used.")
                .env("POSTLINE_DSN"),
        )
        .arg(
            Arg::new(ARG_MAX_CONNECTIONS)
                .long(ARG_MAX_CONNECTIONS)
                .help("Maximum number of pooled database connections")
                .env("POSTLINE_MAX_CONNECTIONS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn postgres_requires_dsn() {
        temp_env::with_vars(
            [
                ("POSTLINE_DSN", None::<&str>),
                ("POSTLINE_STORE", None::<&str>),
            ],
            || {
                let matches = command().get_matches_from(["test"]);
                let result = Options::parse(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("missing required argument: --dsn"));
                }
            },
        );
    }

    #[test]
    fn memory_needs_no_dsn() {
        temp_env::with_vars([("POSTLINE_DSN", None::<&str>)], || {
            let matches = command().get_matches_from(["test", "--store", "memory"]);
            let options = Options::parse(&matches).unwrap();
            assert_eq!(options.backend, Backend::Memory);
            assert!(options.dsn.is_none());
            assert_eq!(options.max_connections, 5);
        });
    }

    #[test]
    fn env_configures_postgres() {
        temp_env::with_vars(
            [
                ("POSTLINE_STORE", Some("postgres")),
                ("POSTLINE_DSN", Some("postgres://user@localhost:5432/postline")),
                ("POSTLINE_MAX_CONNECTIONS", Some("12")),
            ],
            || {
                let matches = command().get_matches_from(["test"]);
                let options = Options::parse(&matches).unwrap();
                assert_eq!(options.backend, Backend::Postgres);
                assert_eq!(
                    options.dsn.as_ref().map(|d| d.expose_secret().to_string()),
                    Some("postgres://user@localhost:5432/postline".to_string())
                );
                assert_eq!(options.max_connections, 12);
            },
        );
    }

    #[test]
    fn backend_names() {
        assert_eq!("Memory".parse::<Backend>(), Ok(Backend::Memory));
        assert!("mongo".parse::<Backend>().is_err());
        assert_eq!(Backend::Postgres.to_string(), "postgres");
    }
}
