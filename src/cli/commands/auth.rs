use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_LOGIN_PATH: &str = "login-path";

#[derive(Debug)]
pub struct Options {
    pub session_ttl_seconds: i64,
    pub cookie_secure: bool,
    pub login_path: String,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the session TTL is not positive or the login path
    /// is not absolute.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(86_400);
        if session_ttl_seconds <= 0 {
            anyhow::bail!("--{ARG_SESSION_TTL_SECONDS} must be positive");
        }

        let login_path = matches
            .get_one::<String>(ARG_LOGIN_PATH)
            .cloned()
            .unwrap_or_else(|| "/login".to_string());
        if !login_path.starts_with('/') {
            anyhow::bail!("--{ARG_LOGIN_PATH} must start with '/'");
        }

        Ok(Self {
            session_ttl_seconds,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
            login_path,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("POSTLINE_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("POSTLINE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Where browser requests without a session are redirected")
                .env("POSTLINE_LOGIN_PATH")
                .default_value("/login"),
        )
}
