//! HTML inspection of identity provider pages.
//!
//! The driver only asks two questions of a page, so the markup knowledge lives behind
//! [`ResponseInterpreter`]. [`ShibbolethInterpreter`] answers them for the Shibboleth
//! IdP v3 templates.

use scraper::{ElementRef, Html, Selector};

use crate::defaults;
use crate::error::{AuthError, AuthResult};

/// Submission target and the two SAML POST binding values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAssertion {
    /// `action` of the auto-post form, as written in the page.
    pub action: String,
    /// Relay state echoed back to the service provider.
    pub relay_state: String,
    /// Encoded SAML response.
    pub saml_response: String,
}

/// Questions the login driver asks of IdP pages.
pub trait ResponseInterpreter: Send + Sync {
    /// Whether `html` is the storage-confirmation interstitial rather than the credential form.
    fn is_confirmation_page(&self, html: &str) -> bool;

    /// Pull the assertion out of the page returned for a credential submission.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthFailed`] when the page shows a rejection message or lacks
    /// the form, its action, or either hidden value.
    fn extract_assertion(&self, html: &str) -> AuthResult<ExtractedAssertion>;
}

/// Interpreter for the Shibboleth IdP login templates.
#[derive(Debug, Clone)]
pub struct ShibbolethInterpreter {
    username_input: Selector,
    password_input: Selector,
    form_error: Selector,
    form: Selector,
    relay_state_input: Selector,
    saml_response_input: Selector,
}

impl ShibbolethInterpreter {
    /// Interpreter using the default selectors and field names.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSelector`] if a selector fails to parse.
    pub fn new() -> AuthResult<Self> {
        Ok(Self {
            username_input: parse_selector(defaults::USERNAME_INPUT_SELECTOR)?,
            password_input: parse_selector(defaults::PASSWORD_INPUT_SELECTOR)?,
            form_error: parse_selector(defaults::FORM_ERROR_SELECTOR)?,
            form: parse_selector(defaults::FORM_SELECTOR)?,
            relay_state_input: parse_selector(&hidden_input(defaults::RELAY_STATE_KEY))?,
            saml_response_input: parse_selector(&hidden_input(defaults::SAML_RESPONSE_KEY))?,
        })
    }
}

impl ResponseInterpreter for ShibbolethInterpreter {
    fn is_confirmation_page(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        first(&document, &self.username_input).is_none()
            && first(&document, &self.password_input).is_none()
    }

    fn extract_assertion(&self, html: &str) -> AuthResult<ExtractedAssertion> {
        let document = Html::parse_document(html);

        if let Some(error) = first(&document, &self.form_error) {
            let message = error.text().collect::<String>();
            return Err(AuthError::AuthFailed { message });
        }

        let form = first(&document, &self.form)
            .ok_or_else(|| AuthError::auth_failed("could not find saml response form"))?;
        let action = form
            .value()
            .attr("action")
            .ok_or_else(|| AuthError::auth_failed("could not find action url"))?;

        let relay_state = hidden_value(form, &self.relay_state_input);
        let saml_response = hidden_value(form, &self.saml_response_input);
        let (Some(relay_state), Some(saml_response)) = (relay_state, saml_response) else {
            return Err(AuthError::auth_failed("could not parse saml response"));
        };

        Ok(ExtractedAssertion {
            action: action.to_string(),
            relay_state: relay_state.to_string(),
            saml_response: saml_response.to_string(),
        })
    }
}

fn hidden_input(name: &str) -> String {
    format!("input[name=\"{name}\"]")
}

fn parse_selector(selector: &str) -> AuthResult<Selector> {
    Selector::parse(selector).map_err(|_| AuthError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn first<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).next()
}

fn hidden_value<'a>(form: ElementRef<'a>, selector: &Selector) -> Option<&'a str> {
    form.select(selector)
        .next()
        .and_then(|input| input.value().attr("value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shibwalk_test_support::fixtures;

    fn interpreter() -> ShibbolethInterpreter {
        ShibbolethInterpreter::new().expect("default selectors parse")
    }

    #[test]
    fn credential_form_is_not_a_confirmation_page() {
        assert!(!interpreter().is_confirmation_page(&fixtures::auth_form(None)));
    }

    #[test]
    fn storage_page_is_a_confirmation_page() {
        assert!(interpreter().is_confirmation_page(&fixtures::storage_confirmation()));
    }

    #[test]
    fn page_with_only_one_credential_field_is_not_a_confirmation_page() {
        let html = r#"<html><body><form><input id="password" name="j_password"></form></body></html>"#;
        assert!(!interpreter().is_confirmation_page(html));
    }

    #[test]
    fn extracts_assertion_from_auto_post_form() -> AuthResult<()> {
        let html = fixtures::saml_post_form(
            "https://portal.student.kit.ac.jp/Shibboleth.sso/SAML2/POST",
            "relay-1",
            "PHNhbWxwOlJlc3BvbnNlLz4=",
        );
        let assertion = interpreter().extract_assertion(&html)?;
        assert_eq!(
            assertion,
            ExtractedAssertion {
                action: "https://portal.student.kit.ac.jp/Shibboleth.sso/SAML2/POST".to_string(),
                relay_state: "relay-1".to_string(),
                saml_response: "PHNhbWxwOlJlc3BvbnNlLz4=".to_string(),
            }
        );
        Ok(())
    }

    #[test]
    fn error_element_text_becomes_the_failure_message() {
        let html = fixtures::auth_form(Some("The password you entered was incorrect."));
        match interpreter().extract_assertion(&html) {
            Err(AuthError::AuthFailed { message }) => {
                assert_eq!(message, "The password you entered was incorrect.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn error_text_is_passed_through_verbatim() {
        let html = r#"<form action="/sso"><p class="form-error">
            Your account is <b>locked</b>.
        </p></form>"#;
        match interpreter().extract_assertion(html) {
            Err(AuthError::AuthFailed { message }) => {
                assert_eq!(message, "\n            Your account is locked.\n        ");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_action_is_a_failure() {
        let html = r#"<form method="post"><input type="hidden" name="RelayState" value="r"><input type="hidden" name="SAMLResponse" value="s"></form>"#;
        assert!(matches!(
            interpreter().extract_assertion(html),
            Err(AuthError::AuthFailed { message }) if message == "could not find action url"
        ));
    }

    #[test]
    fn missing_hidden_value_is_a_failure() {
        let html = r#"<form action="/acs" method="post"><input type="hidden" name="RelayState" value="r"></form>"#;
        assert!(matches!(
            interpreter().extract_assertion(html),
            Err(AuthError::AuthFailed { message }) if message == "could not parse saml response"
        ));
    }

    #[test]
    fn page_without_form_is_a_failure() {
        assert!(matches!(
            interpreter().extract_assertion("<html><body><p>maintenance</p></body></html>"),
            Err(AuthError::AuthFailed { .. })
        ));
    }
}
