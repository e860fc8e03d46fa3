//! Shared error type, credential resolution and configuration loading for the CLI.

use std::fmt::{self, Display, Formatter};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::Url;
use shibwalk_auth::{AuthError, AuthErrorKind, Authenticator, ProtocolConfig, SessionSettings};

/// CLI-level error type separating bad input, refused logins and operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Rejected(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Rejected(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Rejected(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        if let AuthError::InvalidUsername { given } = &err {
            return Self::Validation(format!(
                "invalid username '{given}' (expected b, m or d followed by 7 digits)"
            ));
        }
        match err.kind() {
            AuthErrorKind::InvalidInput => Self::Validation(format!("{:#}", anyhow!(err))),
            AuthErrorKind::Rejected => Self::Rejected(err.to_string()),
            AuthErrorKind::Unreachable | AuthErrorKind::Internal => Self::Failure(anyhow!(err)),
        }
    }
}

/// Everything a command needs to run the login flow.
#[derive(Debug)]
pub(crate) struct LoginContext {
    pub(crate) authenticator: Authenticator,
    pub(crate) settings: SessionSettings,
}

impl LoginContext {
    /// Resolve credentials and configuration from flags, environment and prompts.
    pub(crate) fn from_cli(cli: &crate::cli::Cli) -> CliResult<Self> {
        let username = require_username(cli.username.as_deref())?;
        let password = resolve_password(cli.password.clone())?;
        let config = load_config(
            cli.config.as_deref(),
            cli.login_url.as_ref(),
            cli.idp_domain.as_deref(),
        )?;
        let authenticator = Authenticator::with_config(username, password, config)?;

        Ok(Self {
            authenticator,
            settings: session_settings(cli.timeout),
        })
    }
}

/// Parse a URL argument.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Pass the username through untouched; only absent or blank input is rejected here.
pub(crate) fn require_username(input: Option<&str>) -> CliResult<&str> {
    input
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            CliError::validation("username is required (pass --username or set SHIBWALK_USERNAME)")
        })
}

/// Use the supplied password, or prompt for one when stdin is a terminal.
pub(crate) fn resolve_password(input: Option<String>) -> CliResult<String> {
    if let Some(password) = input.filter(|value| !value.is_empty()) {
        return Ok(password);
    }

    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password("Password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from stdin: {err}"))
        })?;
        if password.is_empty() {
            return Err(CliError::validation("password cannot be empty"));
        }
        return Ok(password);
    }

    Err(CliError::validation(
        "password is required (pass --password or set SHIBWALK_PASSWORD)",
    ))
}

/// Load the protocol configuration, falling back to the built-in defaults, and apply
/// endpoint overrides.
pub(crate) fn load_config(
    path: Option<&Path>,
    login_url: Option<&Url>,
    idp_domain: Option<&str>,
) -> CliResult<ProtocolConfig> {
    let mut config = match path {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))
                .map_err(CliError::failure)?;
            ProtocolConfig::from_json_str(&document)?
        }
        None => ProtocolConfig::default(),
    };

    if let Some(login_url) = login_url {
        config = config.with_login_url(login_url.as_str());
    }
    if let Some(idp_domain) = idp_domain {
        config = config.with_idp_domain(idp_domain);
    }
    Ok(config)
}

pub(crate) fn session_settings(timeout_secs: u64) -> SessionSettings {
    SessionSettings {
        timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        ..SessionSettings::default()
    }
}
