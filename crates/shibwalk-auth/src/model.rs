//! Credential, form bundles, and the protocol configuration.

use std::fmt::{self, Formatter};

use reqwest::Url;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::defaults;
use crate::error::{AuthError, AuthResult};
use crate::validate::validate_username;

/// Username/password pair submitted to the IdP.
///
/// Only constructible through [`Credential::new`], so the username has always passed
/// [`validate_username`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Validate the username and build a credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUsername`] when the username has the wrong shape.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> AuthResult<Self> {
        let username = username.into();
        validate_username(&username)?;
        Ok(Self {
            username,
            password: password.into(),
        })
    }

    /// Validated username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password as supplied by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Ordered form body.
///
/// Serialized as a map so it can be posted with `RequestBuilder::form` and written in
/// JSON configuration documents as `{"key": "value"}`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    /// Empty bundle.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a pair, keeping any existing value for the same key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Insert `key` or overwrite its value, dropping any duplicates of it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(existing, _)| existing == key) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = 0_usize;
                self.pairs.retain(|(existing, _)| {
                    if existing == key {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// First value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the bundle has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over the pairs in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

// Values are left out: the hidden bundle carries the password.
impl fmt::Debug for FormParams {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_set()
            .entries(self.pairs.iter().map(|(key, _)| key))
            .finish()
    }
}

impl Serialize for FormParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FormParamsVisitor;

        impl<'de> Visitor<'de> for FormParamsVisitor {
            type Value = FormParams;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of form field names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params = FormParams::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    params.append(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(FormParamsVisitor)
    }
}

/// Endpoint, form keys, and default bundles driving one identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Form key for the username on the credential form.
    pub username_key: String,
    /// Form key for the password on the credential form.
    pub password_key: String,
    /// IdP host, optionally with `:port`.
    pub idp_domain: String,
    /// Protected URL that starts the flow.
    pub login_url: String,
    /// Bundle posted with the credentials.
    pub hidden_params: FormParams,
    /// Bundle posted to dismiss the storage-confirmation page.
    pub confirmation_params: FormParams,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let hidden_params: FormParams = [(defaults::PROCEED_KEY, defaults::PROCEED_VALUE)]
            .into_iter()
            .collect();
        let confirmation_params: FormParams = [
            (
                defaults::STORAGE_EXCEPTION_KEY,
                defaults::STORAGE_EXCEPTION_VALUE,
            ),
            (defaults::STORAGE_SUCCESS_KEY, defaults::STORAGE_SUCCESS_VALUE),
            (defaults::PROCEED_KEY, defaults::PROCEED_VALUE),
        ]
        .into_iter()
        .collect();

        Self {
            username_key: defaults::USERNAME_KEY.to_string(),
            password_key: defaults::PASSWORD_KEY.to_string(),
            idp_domain: defaults::IDP_DOMAIN.to_string(),
            login_url: defaults::LOGIN_URL.to_string(),
            hidden_params,
            confirmation_params,
        }
    }
}

impl ProtocolConfig {
    /// Replace the login URL.
    #[must_use]
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    /// Replace the IdP domain.
    #[must_use]
    pub fn with_idp_domain(mut self, idp_domain: impl Into<String>) -> Self {
        self.idp_domain = idp_domain.into();
        self
    }

    /// Reject a configuration whose form bundles are both empty.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigIncomplete`].
    pub fn validate(&self) -> AuthResult<()> {
        if self.hidden_params.is_empty() && self.confirmation_params.is_empty() {
            return Err(AuthError::ConfigIncomplete);
        }
        Ok(())
    }

    /// Copy of this configuration with the credential written into the hidden bundle.
    ///
    /// Applying the same credential repeatedly yields the same bundle.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigIncomplete`] when both bundles are empty.
    pub fn apply_credential(&self, credential: &Credential) -> AuthResult<Self> {
        self.validate()?;
        let mut applied = self.clone();
        applied
            .hidden_params
            .set(&self.username_key, credential.username());
        applied
            .hidden_params
            .set(&self.password_key, credential.password());
        Ok(applied)
    }

    /// Whether `url` points at the identity provider.
    ///
    /// A bare domain matches any port; a `host:port` domain matches that authority only.
    #[must_use]
    pub fn is_idp(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if host.eq_ignore_ascii_case(&self.idp_domain) {
            return true;
        }
        url.port_or_known_default()
            .is_some_and(|port| format!("{host}:{port}").eq_ignore_ascii_case(&self.idp_domain))
    }

    /// Parse a JSON document; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigDocument`] for malformed JSON and
    /// [`AuthError::ConfigIncomplete`] when both bundles end up empty.
    pub fn from_json_str(document: &str) -> AuthResult<Self> {
        let config: Self = serde_json::from_str(document)
            .map_err(|source| AuthError::ConfigDocument { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigDocument`] if serialization fails.
    pub fn to_json_string(&self) -> AuthResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| AuthError::ConfigDocument { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("b1234567", "passwd").expect("valid credential")
    }

    #[test]
    fn credential_rejects_invalid_username() {
        assert!(matches!(
            Credential::new("testuser", "x"),
            Err(AuthError::InvalidUsername { .. })
        ));
    }

    #[test]
    fn credential_debug_redacts_password() {
        let rendered = format!("{:?}", credential());
        assert!(rendered.contains("b1234567"));
        assert!(!rendered.contains("passwd"));
    }

    #[test]
    fn default_config_carries_both_bundles() {
        let config = ProtocolConfig::default();
        assert_eq!(config.idp_domain, defaults::IDP_DOMAIN);
        assert_eq!(config.login_url, defaults::LOGIN_URL);
        assert_eq!(config.hidden_params.len(), 1);
        assert_eq!(config.hidden_params.get(defaults::PROCEED_KEY), Some(""));
        assert_eq!(
            config.confirmation_params.get(defaults::STORAGE_SUCCESS_KEY),
            Some("true")
        );
        assert_eq!(
            config.confirmation_params.get(defaults::STORAGE_EXCEPTION_KEY),
            Some("")
        );
        assert_eq!(
            config.confirmation_params.get(defaults::PROCEED_KEY),
            Some("")
        );
    }

    #[test]
    fn apply_credential_inserts_then_overwrites() -> AuthResult<()> {
        let applied = ProtocolConfig::default().apply_credential(&credential())?;
        assert_eq!(
            applied.hidden_params.get(defaults::USERNAME_KEY),
            Some("b1234567")
        );
        assert_eq!(applied.hidden_params.get(defaults::PASSWORD_KEY), Some("passwd"));

        let other = Credential::new("m7654321", "other")?;
        let switched = applied.apply_credential(&other)?;
        assert_eq!(
            switched.hidden_params.get(defaults::USERNAME_KEY),
            Some("m7654321")
        );
        assert_eq!(switched.hidden_params.get(defaults::PASSWORD_KEY), Some("other"));
        assert_eq!(switched.hidden_params.len(), 3);
        Ok(())
    }

    #[test]
    fn apply_credential_is_idempotent() -> AuthResult<()> {
        let once = ProtocolConfig::default().apply_credential(&credential())?;
        let twice = once.apply_credential(&credential())?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn apply_credential_collapses_duplicate_keys() -> AuthResult<()> {
        let mut config = ProtocolConfig::default();
        config.hidden_params.append(defaults::USERNAME_KEY, "first");
        config.hidden_params.append(defaults::USERNAME_KEY, "second");
        let applied = config.apply_credential(&credential())?;
        let usernames = applied
            .hidden_params
            .iter()
            .filter(|(key, _)| *key == defaults::USERNAME_KEY)
            .count();
        assert_eq!(usernames, 1);
        Ok(())
    }

    #[test]
    fn apply_credential_requires_a_bundle() {
        let config = ProtocolConfig {
            hidden_params: FormParams::new(),
            confirmation_params: FormParams::new(),
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            config.apply_credential(&credential()),
            Err(AuthError::ConfigIncomplete)
        ));

        let confirmation_only = ProtocolConfig {
            hidden_params: FormParams::new(),
            ..ProtocolConfig::default()
        };
        assert!(confirmation_only.apply_credential(&credential()).is_ok());
    }

    #[test]
    fn is_idp_matches_host_and_authority() -> Result<(), url::ParseError> {
        let config = ProtocolConfig::default();
        assert!(config.is_idp(&Url::parse(
            "https://auth.cis.kit.ac.jp/idp/profile/SAML2/Redirect/SSO?execution=e1s1"
        )?));
        assert!(!config.is_idp(&Url::parse("https://portal.student.kit.ac.jp/")?));

        let loopback = ProtocolConfig::default().with_idp_domain("127.0.0.1:8443");
        assert!(loopback.is_idp(&Url::parse("http://127.0.0.1:8443/sso")?));
        assert!(!loopback.is_idp(&Url::parse("http://127.0.0.1:8080/")?));
        Ok(())
    }

    #[test]
    fn json_document_overrides_selected_fields() -> AuthResult<()> {
        let config = ProtocolConfig::from_json_str(
            r#"{"login_url": "https://portal.example.test/", "idp_domain": "idp.example.test"}"#,
        )?;
        assert_eq!(config.login_url, "https://portal.example.test/");
        assert_eq!(config.idp_domain, "idp.example.test");
        assert_eq!(config.username_key, defaults::USERNAME_KEY);

        let rendered = config.to_json_string()?;
        assert_eq!(ProtocolConfig::from_json_str(&rendered)?, config);
        Ok(())
    }

    #[test]
    fn json_document_with_empty_bundles_is_incomplete() {
        let result =
            ProtocolConfig::from_json_str(r#"{"hidden_params": {}, "confirmation_params": {}}"#);
        assert!(matches!(result, Err(AuthError::ConfigIncomplete)));
        assert!(matches!(
            ProtocolConfig::from_json_str("{not json"),
            Err(AuthError::ConfigDocument { .. })
        ));
    }

    #[test]
    fn form_params_debug_hides_values() {
        let mut params = FormParams::new();
        params.set("j_password", "secret");
        assert!(!format!("{params:?}").contains("secret"));
    }
}
