//! Cookie-bearing HTTP session borrowed by the login driver.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};

use crate::error::{AuthError, AuthResult};

/// Redirect hops followed per exchange; the SSO dance needs a handful at most.
const MAX_REDIRECTS: usize = 10;
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings applied whenever the session (re)builds its HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// `User-Agent` header sent with every request.
    pub user_agent: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: Some(concat!("shibwalk/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// HTTP client plus the cookie jar it writes to.
///
/// Owned by the caller; the login driver borrows it mutably for one attempt and leaves
/// the IdP and resource cookies in the jar for subsequent requests.
#[derive(Debug, Clone)]
pub struct Session {
    settings: SessionSettings,
    jar: Option<Arc<Jar>>,
    client: Client,
}

impl Session {
    /// Session with default settings and an empty cookie store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn new() -> AuthResult<Self> {
        Self::with_settings(SessionSettings::default())
    }

    /// Session with an empty cookie store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn with_settings(settings: SessionSettings) -> AuthResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_client(&settings, Some(&jar))?;
        Ok(Self {
            settings,
            jar: Some(jar),
            client,
        })
    }

    /// Session whose client keeps no cookies until a login attaches a store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn without_cookie_store(settings: SessionSettings) -> AuthResult<Self> {
        let client = build_client(&settings, None)?;
        Ok(Self {
            settings,
            jar: None,
            client,
        })
    }

    /// HTTP client to use for requests that should carry the session cookies.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Settings the client was built from.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether a cookie store is attached.
    #[must_use]
    pub const fn has_cookie_store(&self) -> bool {
        self.jar.is_some()
    }

    /// `Cookie` header value the session would send to `url`, if any.
    #[must_use]
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        let header = self.jar.as_ref()?.cookies(url)?;
        header.to_str().ok().map(str::to_string)
    }

    /// Attach an empty cookie store when none exists. An existing store is kept as is.
    pub(crate) fn ensure_cookie_store(&mut self) -> AuthResult<()> {
        if self.jar.is_some() {
            return Ok(());
        }
        let jar = Arc::new(Jar::default());
        self.client = build_client(&self.settings, Some(&jar))?;
        self.jar = Some(jar);
        tracing::debug!("attached cookie store to session");
        Ok(())
    }
}

fn build_client(settings: &SessionSettings, jar: Option<&Arc<Jar>>) -> AuthResult<Client> {
    let mut builder = Client::builder().redirect(Policy::limited(MAX_REDIRECTS));
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(user_agent) = &settings.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }
    if let Some(jar) = jar {
        builder = builder.cookie_provider(Arc::clone(jar));
    }
    builder
        .build()
        .map_err(|source| AuthError::ClientBuild { source })
}
