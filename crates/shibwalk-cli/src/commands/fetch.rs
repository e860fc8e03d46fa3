use anyhow::anyhow;
use tracing::debug;

use crate::cli::FetchArgs;
use crate::client::{CliError, CliResult, LoginContext};
use crate::commands::login::{establish_session, render_outcome};

pub(crate) async fn handle_fetch(ctx: &LoginContext, args: FetchArgs) -> CliResult<()> {
    let (session, outcome) = establish_session(ctx).await?;
    debug!(outcome = %render_outcome(&outcome), "fetching through session");

    let response = session
        .client()
        .get(args.url.clone())
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {} failed: {err}", args.url)))?;

    let status = response.status();
    println!("status: {}", status.as_u16());
    println!("url: {}", response.url());

    if args.body {
        let body = response.text().await.map_err(|err| {
            CliError::failure(anyhow!("failed to read response body: {err}"))
        })?;
        println!("{body}");
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!("request failed with status {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session_settings;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use reqwest::Url;
    use shibwalk_auth::{Authenticator, ProtocolConfig};

    fn context(login_url: String) -> Result<LoginContext> {
        Ok(LoginContext {
            authenticator: Authenticator::with_config(
                "b1234567",
                "passwd",
                ProtocolConfig::default().with_login_url(login_url),
            )?,
            settings: session_settings(5),
        })
    }

    #[tokio::test]
    async fn fetch_requests_url_after_login() -> Result<()> {
        let server = MockServer::start_async().await;
        let portal = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("portal");
        });
        let page = server.mock(|when, then| {
            when.method(GET).path("/grades");
            then.status(200).body("grades");
        });

        let ctx = context(server.url("/"))?;
        let args = FetchArgs {
            url: Url::parse(&server.url("/grades"))?,
            body: true,
        };
        handle_fetch(&ctx, args)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        portal.assert();
        page.assert();
        Ok(())
    }

    #[tokio::test]
    async fn fetch_reports_error_status_as_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        let _portal = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("portal");
        });
        let _missing = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let ctx = context(server.url("/"))?;
        let args = FetchArgs {
            url: Url::parse(&server.url("/missing"))?,
            body: false,
        };
        let result = handle_fetch(&ctx, args).await;

        assert!(matches!(result, Err(CliError::Failure(_))));
        Ok(())
    }
}
