//! The login state machine.
//!
//! ```text
//! Start -> FetchedLoginPage -> AlreadyAuthenticated
//!                           -> [AtConfirmation -> SubmittedConfirmation]
//!                              -> SubmittedCredentials -> SubmittedAssertion -> Authenticated | Failed
//! ```
//!
//! Every step depends on the previous response, so the exchanges run strictly in
//! sequence on the caller's session. Status codes are logged but never trusted: the IdP
//! answers 200 for accepted and rejected submissions alike, and the only authoritative
//! signal is where the final redirect lands.

use reqwest::{Client, Response, Url};
use tracing::{debug, info, instrument, warn};

use crate::defaults;
use crate::error::{AuthError, AuthResult};
use crate::interpret::{ExtractedAssertion, ResponseInterpreter};
use crate::model::{FormParams, ProtocolConfig};
use crate::session::Session;

/// Failure message when the assertion hand-off bounces back to the IdP.
pub const RETURNED_TO_LOGIN_PAGE: &str = "returned to login page";

const OP_FETCH_LOGIN_PAGE: &str = "fetch login page";
const OP_SUBMIT_CONFIRMATION: &str = "submit storage confirmation";
const OP_SUBMIT_CREDENTIALS: &str = "submit credentials";
const OP_SUBMIT_ASSERTION: &str = "submit saml assertion";

/// Successful end states of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The login URL did not redirect to the IdP; nothing was submitted.
    AlreadyAuthenticated {
        /// Effective URL of the login page fetch.
        url: Url,
    },
    /// The SAML exchange completed and control left the IdP.
    Authenticated {
        /// Effective URL after the assertion hand-off.
        url: Url,
    },
}

impl LoginOutcome {
    /// Effective URL the flow ended on.
    #[must_use]
    pub const fn url(&self) -> &Url {
        match self {
            Self::AlreadyAuthenticated { url } | Self::Authenticated { url } => url,
        }
    }
}

/// Response body paired with the URL it was served from after redirects.
struct Page {
    url: Url,
    body: String,
}

/// Drive one login attempt on `session` using `config`.
///
/// Attaches a cookie store to the session if it has none; cookies set along the way
/// stay in the session.
///
/// # Errors
///
/// - [`AuthError::InvalidUrl`] when the login URL or the extracted action does not parse.
/// - [`AuthError::AuthFailed`] when the IdP rejects the credentials, serves an unexpected
///   page, or the hand-off lands back on the IdP.
/// - [`AuthError::Transport`] for network failures and timeouts, unmodified.
#[instrument(name = "shibwalk.login", skip_all, fields(login_url = %config.login_url))]
pub async fn login(
    session: &mut Session,
    config: &ProtocolConfig,
    interpreter: &dyn ResponseInterpreter,
) -> AuthResult<LoginOutcome> {
    session.ensure_cookie_store()?;
    let client = session.client().clone();

    let login_url = Url::parse(&config.login_url)
        .map_err(|source| AuthError::invalid_url("login_url", &config.login_url, source))?;
    let response = send(client.get(login_url.clone()), OP_FETCH_LOGIN_PAGE, &login_url).await?;

    if !config.is_idp(response.url()) {
        let url = response.url().clone();
        info!(url = %url, "login url served without identity provider redirect");
        return Ok(LoginOutcome::AlreadyAuthenticated { url });
    }

    let page = read_page(response, OP_FETCH_LOGIN_PAGE).await?;
    debug!(url = %page.url, "redirected to identity provider");

    let credential_form = if interpreter.is_confirmation_page(&page.body) {
        debug!(url = %page.url, "storage confirmation page detected");
        post_form(&client, OP_SUBMIT_CONFIRMATION, &page.url, &config.confirmation_params).await?
    } else {
        page
    };

    let assertion_page = post_form(
        &client,
        OP_SUBMIT_CREDENTIALS,
        &credential_form.url,
        &config.hidden_params,
    )
    .await?;

    let assertion = interpreter.extract_assertion(&assertion_page.body)?;
    let action = assertion_page
        .url
        .join(&assertion.action)
        .map_err(|source| AuthError::invalid_url("form action", &assertion.action, source))?;
    debug!(action = %action, "extracted saml assertion");

    let landed = send(
        client.post(action.clone()).form(&assertion_form(&assertion)),
        OP_SUBMIT_ASSERTION,
        &action,
    )
    .await?;

    let url = landed.url().clone();
    if config.is_idp(&url) {
        warn!(url = %url, "assertion hand-off returned to the identity provider");
        return Err(AuthError::auth_failed(RETURNED_TO_LOGIN_PAGE));
    }

    info!(url = %url, "login completed");
    Ok(LoginOutcome::Authenticated { url })
}

fn assertion_form(assertion: &ExtractedAssertion) -> FormParams {
    [
        (defaults::RELAY_STATE_KEY, assertion.relay_state.as_str()),
        (defaults::SAML_RESPONSE_KEY, assertion.saml_response.as_str()),
    ]
    .into_iter()
    .collect()
}

async fn post_form(
    client: &Client,
    operation: &'static str,
    url: &Url,
    params: &FormParams,
) -> AuthResult<Page> {
    let response = send(client.post(url.clone()).form(params), operation, url).await?;
    read_page(response, operation).await
}

async fn send(
    request: reqwest::RequestBuilder,
    operation: &'static str,
    url: &Url,
) -> AuthResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|source| AuthError::transport(operation, url.as_str(), source))?;
    debug!(
        operation,
        status = response.status().as_u16(),
        url = %response.url(),
        "exchange completed"
    );
    Ok(response)
}

async fn read_page(response: Response, operation: &'static str) -> AuthResult<Page> {
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|source| AuthError::transport(operation, url.as_str(), source))?;
    Ok(Page { url, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_form_uses_binding_field_names() {
        let form = assertion_form(&ExtractedAssertion {
            action: "/acs".to_string(),
            relay_state: "relay".to_string(),
            saml_response: "response".to_string(),
        });
        assert_eq!(form.get(defaults::RELAY_STATE_KEY), Some("relay"));
        assert_eq!(form.get(defaults::SAML_RESPONSE_KEY), Some("response"));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn outcome_exposes_final_url() -> Result<(), url::ParseError> {
        let url = Url::parse("https://portal.student.kit.ac.jp/")?;
        let outcome = LoginOutcome::Authenticated { url: url.clone() };
        assert_eq!(outcome.url(), &url);
        Ok(())
    }
}
