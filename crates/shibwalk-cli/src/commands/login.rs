use shibwalk_auth::{LoginOutcome, Session};
use tracing::info;

use crate::client::{CliResult, LoginContext};

pub(crate) async fn handle_login(ctx: &LoginContext) -> CliResult<()> {
    let (_, outcome) = establish_session(ctx).await?;
    println!("{}", render_outcome(&outcome));
    Ok(())
}

/// Build a session from the context settings and run the login flow on it.
pub(crate) async fn establish_session(ctx: &LoginContext) -> CliResult<(Session, LoginOutcome)> {
    let mut session = Session::with_settings(ctx.settings.clone())?;
    let outcome = ctx.authenticator.login_with(&mut session).await?;
    info!(
        username = ctx.authenticator.credential().username(),
        url = %outcome.url(),
        "session established"
    );
    Ok((session, outcome))
}

pub(crate) fn render_outcome(outcome: &LoginOutcome) -> String {
    match outcome {
        LoginOutcome::AlreadyAuthenticated { url } => format!("already authenticated: {url}"),
        LoginOutcome::Authenticated { url } => format!("authenticated: {url}"),
    }
}
