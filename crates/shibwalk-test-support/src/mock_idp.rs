//! In-process service provider and identity provider pair for login flow tests.
//!
//! Both run on loopback with distinct ports, so a config with
//! `idp_domain = mock.idp_domain()` tells them apart. Every handled request is
//! appended to an event log the tests can assert on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::fixtures::{self, ACS_PATH, SSO_PATH};

/// Username accepted by default.
pub const VALID_USERNAME: &str = "b1234567";
/// Password accepted by default.
pub const VALID_PASSWORD: &str = "passwd";
/// Relay state issued with the assertion.
pub const RELAY_STATE: &str = "ss:mem:5f0c3e";
/// Encoded assertion issued on successful credential submission.
pub const SAML_RESPONSE: &str = "PHNhbWxwOlJlc3BvbnNlIElEPSJtb2NrIi8+";
/// Message rendered when credentials are rejected.
pub const REJECTION_MESSAGE: &str = "The password you entered was incorrect.";
/// Message rendered when credentials arrive before local storage was acknowledged.
pub const STORAGE_PENDING_MESSAGE: &str = "Session storage was not confirmed.";
/// Cookie set by the service provider once the assertion is consumed.
pub const SP_SESSION_COOKIE: &str = "_shibsession_mock";

const USERNAME_FIELD: &str = "j_username";
const PASSWORD_FIELD: &str = "j_password";
const PROCEED_FIELD: &str = "_eventId_proceed";
const STORAGE_SUCCESS_FIELD: &str = "shib_idp_ls_success.shib_idp_session_ss";
const STORAGE_EXCEPTION_FIELD: &str = "shib_idp_ls_exception.shib_idp_session_ss";

/// Behaviour switches for [`MockIdp`].
#[derive(Debug, Clone)]
pub struct MockIdpOptions {
    /// Serve the storage-confirmation interstitial until it is acknowledged once.
    pub storage_confirmation: bool,
    /// Serve the protected resource without redirecting to the IdP.
    pub already_authenticated: bool,
    /// Bounce the assertion back to the IdP instead of creating a session.
    pub reject_assertion: bool,
    /// Username the IdP accepts.
    pub username: String,
    /// Password the IdP accepts.
    pub password: String,
}

impl Default for MockIdpOptions {
    fn default() -> Self {
        Self {
            storage_confirmation: false,
            already_authenticated: false,
            reject_assertion: false,
            username: VALID_USERNAME.to_string(),
            password: VALID_PASSWORD.to_string(),
        }
    }
}

/// Requests observed by the mock servers, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// `GET /` on the service provider.
    ResourceRequested,
    /// `GET` of the IdP SSO endpoint.
    SsoPageServed,
    /// Storage-confirmation form posted to the IdP.
    ConfirmationSubmitted,
    /// Credential form posted to the IdP.
    CredentialsSubmitted,
    /// Assertion posted to the service provider.
    AssertionSubmitted,
}

struct MockState {
    options: MockIdpOptions,
    sp_base: String,
    idp_base: String,
    storage_pending: AtomicBool,
    events: Mutex<Vec<MockEvent>>,
}

impl MockState {
    fn record(&self, event: MockEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn sso_url(&self) -> String {
        format!("{}{SSO_PATH}?execution=e1s1", self.idp_base)
    }
}

/// Running service provider and identity provider.
pub struct MockIdp {
    state: Arc<MockState>,
    idp_domain: String,
    tasks: Vec<JoinHandle<()>>,
}

impl MockIdp {
    /// Bind both servers on ephemeral loopback ports and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be bound.
    pub async fn start(options: MockIdpOptions) -> Result<Self> {
        let sp_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind service provider listener")?;
        let idp_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind identity provider listener")?;
        let sp_addr = sp_listener.local_addr()?;
        let idp_addr = idp_listener.local_addr()?;

        let state = Arc::new(MockState {
            storage_pending: AtomicBool::new(options.storage_confirmation),
            options,
            sp_base: format!("http://{sp_addr}"),
            idp_base: format!("http://{idp_addr}"),
            events: Mutex::new(Vec::new()),
        });

        let sp_app = Router::new()
            .route("/", get(resource))
            .route(ACS_PATH, post(consume_assertion))
            .with_state(Arc::clone(&state));
        let idp_app = Router::new()
            .route(SSO_PATH, get(sso_page).post(sso_submit))
            .with_state(Arc::clone(&state));

        let tasks = vec![
            tokio::spawn(async move {
                let _ = axum::serve(sp_listener, sp_app).await;
            }),
            tokio::spawn(async move {
                let _ = axum::serve(idp_listener, idp_app).await;
            }),
        ];

        Ok(Self {
            state,
            idp_domain: idp_addr.to_string(),
            tasks,
        })
    }

    /// Protected resource URL that starts the flow.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}/", self.state.sp_base)
    }

    /// Protected resource URL, parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse.
    pub fn resource_url(&self) -> Result<Url> {
        Url::parse(&self.login_url()).context("invalid service provider URL")
    }

    /// `host:port` authority of the identity provider.
    #[must_use]
    pub fn idp_domain(&self) -> &str {
        &self.idp_domain
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.state
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded occurrences of `event`.
    #[must_use]
    pub fn count(&self, event: MockEvent) -> usize {
        self.events()
            .into_iter()
            .filter(|recorded| *recorded == event)
            .count()
    }
}

impl Drop for MockIdp {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn resource(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record(MockEvent::ResourceRequested);
    let has_session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|cookies| cookies.contains(&format!("{SP_SESSION_COOKIE}=")));

    if state.options.already_authenticated || has_session {
        return Html(fixtures::portal_page()).into_response();
    }
    redirect(&state.sso_url(), None)
}

async fn sso_page(State(state): State<Arc<MockState>>) -> Response {
    state.record(MockEvent::SsoPageServed);
    let page = if state.storage_pending.load(Ordering::SeqCst) {
        fixtures::storage_confirmation()
    } else {
        fixtures::auth_form(None)
    };
    (
        [(header::SET_COOKIE, "JSESSIONID=mock-idp; Path=/idp; HttpOnly")],
        Html(page),
    )
        .into_response()
}

async fn sso_submit(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if let Some(success) = form.get(STORAGE_SUCCESS_FIELD) {
        state.record(MockEvent::ConfirmationSubmitted);
        if success != "true" || !form.contains_key(STORAGE_EXCEPTION_FIELD) {
            return (
                StatusCode::BAD_REQUEST,
                Html(fixtures::storage_confirmation()),
            )
                .into_response();
        }
        state.storage_pending.store(false, Ordering::SeqCst);
        return Html(fixtures::auth_form(None)).into_response();
    }

    state.record(MockEvent::CredentialsSubmitted);
    if state.storage_pending.load(Ordering::SeqCst) {
        return Html(fixtures::auth_form(Some(STORAGE_PENDING_MESSAGE))).into_response();
    }
    let accepted = form.contains_key(PROCEED_FIELD)
        && form.get(USERNAME_FIELD) == Some(&state.options.username)
        && form.get(PASSWORD_FIELD) == Some(&state.options.password);
    if !accepted {
        return Html(fixtures::auth_form(Some(REJECTION_MESSAGE))).into_response();
    }

    let action = format!("{}{ACS_PATH}", state.sp_base);
    Html(fixtures::saml_post_form(&action, RELAY_STATE, SAML_RESPONSE)).into_response()
}

async fn consume_assertion(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.record(MockEvent::AssertionSubmitted);
    let valid = form.get("RelayState").map(String::as_str) == Some(RELAY_STATE)
        && form.get("SAMLResponse").map(String::as_str) == Some(SAML_RESPONSE);

    if state.options.reject_assertion || !valid {
        return redirect(&state.sso_url(), None);
    }
    let cookie = format!("{SP_SESSION_COOKIE}=authenticated; Path=/; HttpOnly");
    redirect("/", Some(cookie))
}

fn redirect(location: &str, cookie: Option<String>) -> Response {
    let mut response =
        (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response();
    if let Some(cookie) = cookie.and_then(|value| value.parse::<HeaderValue>().ok()) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
