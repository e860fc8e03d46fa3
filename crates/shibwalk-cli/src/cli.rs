//! Argument parsing, logging setup and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use shibwalk_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, command_span, init_logging,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{CliResult, LoginContext, parse_url};
use crate::commands::fetch::handle_fetch;
use crate::commands::login::handle_login;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parses CLI arguments, installs logging, executes the requested command and
/// reports failures on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("SHIBWALK_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let trace_id = Uuid::new_v4().to_string();
    let span = command_span(command_label(&cli.command), &trace_id);

    match dispatch(cli).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = LoginContext::from_cli(&cli)?;

    match cli.command {
        Command::Login => handle_login(&ctx).await,
        Command::Fetch(args) => handle_fetch(&ctx, args).await,
    }
}

#[derive(Parser)]
#[command(
    name = "shibwalk",
    version,
    about = "Log in through a Shibboleth identity provider"
)]
pub(crate) struct Cli {
    #[arg(short, long, global = true, env = "SHIBWALK_USERNAME")]
    pub(crate) username: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SHIBWALK_PASSWORD",
        hide_env_values = true,
        help = "Password; prompted for when omitted on a terminal"
    )]
    pub(crate) password: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SHIBWALK_CONFIG",
        help = "JSON protocol configuration file"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, env = "SHIBWALK_LOGIN_URL", value_parser = parse_url)]
    pub(crate) login_url: Option<Url>,
    #[arg(long, global = true, env = "SHIBWALK_IDP_DOMAIN")]
    pub(crate) idp_domain: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SHIBWALK_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Per-request timeout in seconds; 0 disables it"
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "SHIBWALK_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "SHIBWALK_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "json or pretty; defaults to pretty in debug builds"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the login flow and report where it ended.
    Login,
    /// Log in, then GET a URL through the authenticated session.
    Fetch(FetchArgs),
}

#[derive(Args)]
pub(crate) struct FetchArgs {
    #[arg(value_parser = parse_url, help = "Protected URL to request")]
    pub(crate) url: Url,
    #[arg(long, help = "Print the response body")]
    pub(crate) body: bool,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login => "login",
        Command::Fetch(_) => "fetch",
    }
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input
        .parse::<LogFormat>()
        .map_err(|err| format!("{err} '{input}' (expected json or pretty)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn parses_fetch_with_global_flags() -> Result<()> {
        let cli = Cli::try_parse_from([
            "shibwalk",
            "fetch",
            "https://portal.student.kit.ac.jp/home",
            "--body",
            "--username",
            "b1234567",
            "--timeout",
            "5",
            "--log-format",
            "json",
        ])?;
        assert_eq!(cli.username.as_deref(), Some("b1234567"));
        assert_eq!(cli.timeout, 5);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Command::Fetch(args) => {
                assert_eq!(args.url.as_str(), "https://portal.student.kit.ac.jp/home");
                assert!(args.body);
            }
            Command::Login => panic!("expected fetch command"),
        }
        Ok(())
    }

    #[test]
    fn rejects_unknown_log_format() {
        let parsed = Cli::try_parse_from(["shibwalk", "login", "--log-format", "yaml"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_malformed_login_url() {
        let parsed = Cli::try_parse_from(["shibwalk", "login", "--login-url", "not a url"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn command_labels_are_stable() -> Result<()> {
        assert_eq!(command_label(&Command::Login), "login");
        let fetch = Command::Fetch(FetchArgs {
            url: Url::parse("https://portal.student.kit.ac.jp/")?,
            body: false,
        });
        assert_eq!(command_label(&fetch), "fetch");
        Ok(())
    }
}
