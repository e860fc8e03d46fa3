//! Stateful facade holding the current credential and protocol configuration.
//!
//! # Design
//! - Every mutation builds the complete next state first and commits it in one
//!   assignment, so a failed `configure`/`login_as` leaves the previous state intact.
//! - The session is never owned here; it is borrowed per login.

use crate::driver::{self, LoginOutcome};
use crate::error::AuthResult;
use crate::interpret::{ResponseInterpreter, ShibbolethInterpreter};
use crate::model::{Credential, ProtocolConfig};
use crate::session::Session;

/// Login facade for one account at a time.
pub struct Authenticator {
    credential: Credential,
    config: ProtocolConfig,
    interpreter: Box<dyn ResponseInterpreter>,
}

impl Authenticator {
    /// Validate the username and prepare the default configuration for it.
    ///
    /// No request is made until [`Authenticator::login`] or
    /// [`Authenticator::login_with`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::InvalidUsername`] for a malformed username.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> AuthResult<Self> {
        Self::with_config(username, password, ProtocolConfig::default())
    }

    /// Like [`Authenticator::new`] but starting from a caller-supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::InvalidUsername`] or
    /// [`crate::AuthError::ConfigIncomplete`].
    pub fn with_config(
        username: impl Into<String>,
        password: impl Into<String>,
        config: ProtocolConfig,
    ) -> AuthResult<Self> {
        let credential = Credential::new(username, password)?;
        let config = config.apply_credential(&credential)?;
        Ok(Self {
            credential,
            config,
            interpreter: Box::new(ShibbolethInterpreter::new()?),
        })
    }

    /// Replace the page interpreter, e.g. for an IdP with different markup.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl ResponseInterpreter + 'static) -> Self {
        self.interpreter = Box::new(interpreter);
        self
    }

    /// Current credential.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Current configuration, with the credential applied.
    #[must_use]
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Switch to a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::ConfigIncomplete`] when both form bundles are empty;
    /// the current configuration is kept.
    pub fn configure(&mut self, config: ProtocolConfig) -> AuthResult<()> {
        self.config = config.apply_credential(&self.credential)?;
        Ok(())
    }

    /// Switch to another account.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::InvalidUsername`] for a malformed username; the current
    /// credential and configuration are kept.
    pub fn login_as(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> AuthResult<()> {
        let credential = Credential::new(username, password)?;
        let config = self.config.apply_credential(&credential)?;
        self.credential = credential;
        self.config = config;
        Ok(())
    }

    /// Log in on a caller-owned session.
    ///
    /// # Errors
    ///
    /// Propagates every error of [`driver::login`].
    pub async fn login_with(&self, session: &mut Session) -> AuthResult<LoginOutcome> {
        driver::login(session, &self.config, self.interpreter.as_ref()).await
    }

    /// Log in on a fresh default session and hand it back with its cookies.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuthError::ClientBuild`] if the session cannot be created, and
    /// otherwise propagates every error of [`driver::login`].
    pub async fn login(&self) -> AuthResult<(Session, LoginOutcome)> {
        let mut session = Session::new()?;
        let outcome = self.login_with(&mut session).await?;
        Ok((session, outcome))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Authenticator")
            .field("credential", &self.credential)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
