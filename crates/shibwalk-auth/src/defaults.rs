//! Fixed endpoint, form keys, and markers for the default identity provider.
//!
//! # Design
//! - Values only; `ProtocolConfig::default` assembles them into an injectable config.
//! - Selector strings describe the IdP's markup and are consumed by `ShibbolethInterpreter`.

/// Host of the identity provider.
pub const IDP_DOMAIN: &str = "auth.cis.kit.ac.jp";
/// Protected resource whose access triggers the SSO redirect.
pub const LOGIN_URL: &str = "https://portal.student.kit.ac.jp/";

/// Form key carrying the username on the credential form.
pub const USERNAME_KEY: &str = "j_username";
/// Form key carrying the password on the credential form.
pub const PASSWORD_KEY: &str = "j_password";
/// Hidden input holding the relay state on the SAML auto-post form.
pub const RELAY_STATE_KEY: &str = "RelayState";
/// Hidden input holding the encoded assertion on the SAML auto-post form.
pub const SAML_RESPONSE_KEY: &str = "SAMLResponse";

/// "Proceed" marker required on every submission to the IdP.
pub const PROCEED_KEY: &str = "_eventId_proceed";
/// Value sent with [`PROCEED_KEY`].
pub const PROCEED_VALUE: &str = "";
/// Local storage exception marker of the storage-confirmation page.
pub const STORAGE_EXCEPTION_KEY: &str = "shib_idp_ls_exception.shib_idp_session_ss";
/// Value sent with [`STORAGE_EXCEPTION_KEY`].
pub const STORAGE_EXCEPTION_VALUE: &str = "";
/// Local storage success marker of the storage-confirmation page.
pub const STORAGE_SUCCESS_KEY: &str = "shib_idp_ls_success.shib_idp_session_ss";
/// Value sent with [`STORAGE_SUCCESS_KEY`].
pub const STORAGE_SUCCESS_VALUE: &str = "true";

/// Username field on the credential form.
pub const USERNAME_INPUT_SELECTOR: &str = "input[id='username']";
/// Password field on the credential form.
pub const PASSWORD_INPUT_SELECTOR: &str = "input[id='password']";
/// Error paragraph rendered when the IdP rejects credentials.
pub const FORM_ERROR_SELECTOR: &str = "p[class=\"form-error\"]";
/// Form element of the SAML auto-post page.
pub const FORM_SELECTOR: &str = "form";
