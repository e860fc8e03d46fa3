//! HTML pages modelled on the Shibboleth IdP v3 templates.

/// Path of the IdP's SSO endpoint (redirect binding).
pub const SSO_PATH: &str = "/idp/profile/SAML2/Redirect/SSO";
/// Path of the service provider's assertion consumer service.
pub const ACS_PATH: &str = "/Shibboleth.sso/SAML2/POST";

/// Credential form, optionally carrying the IdP's rejection message.
#[must_use]
pub fn auth_form(error: Option<&str>) -> String {
    let error = error.map_or_else(String::new, |message| {
        format!(
            r#"<section><p class="form-error">{}</p></section>"#,
            escape(message)
        )
    });
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Web Login Service</title></head>
  <body>
    <div class="wrapper">
      <form action="{SSO_PATH}?execution=e1s2" method="post">
        {error}
        <div class="form-element-wrapper">
          <label for="username">Username</label>
          <input class="form-element form-field" id="username" name="j_username" type="text" value="">
        </div>
        <div class="form-element-wrapper">
          <label for="password">Password</label>
          <input class="form-element form-field" id="password" name="j_password" type="password" value="">
        </div>
        <div class="form-element-wrapper">
          <button class="form-element form-button" type="submit" name="_eventId_proceed">Login</button>
        </div>
      </form>
    </div>
  </body>
</html>
"#
    )
}

/// Local storage interstitial shown before the credential form.
#[must_use]
pub fn storage_confirmation() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Loading Session Information</title></head>
  <body onload="doLoad()">
    <noscript>
      <p><strong>Note:</strong> Since your browser does not support JavaScript, you must press the Continue button once to proceed.</p>
    </noscript>
    <form name="form1" action="{SSO_PATH}?execution=e1s1" method="post">
      <input type="hidden" name="shib_idp_ls_exception.shib_idp_session_ss" value="">
      <input type="hidden" name="shib_idp_ls_success.shib_idp_session_ss" value="false">
      <input type="hidden" name="shib_idp_ls_value.shib_idp_session_ss" value="">
      <noscript><input type="submit" name="_eventId_proceed" value="Continue"></noscript>
    </form>
  </body>
</html>
"#
    )
}

/// Auto-submitting SAML POST binding form.
#[must_use]
pub fn saml_post_form(action: &str, relay_state: &str, saml_response: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body onload="document.forms[0].submit()">
    <noscript>
      <p><strong>Note:</strong> Since your browser does not support JavaScript, you must press the Continue button once to proceed.</p>
    </noscript>
    <form action="{}" method="post">
      <div>
        <input type="hidden" name="RelayState" value="{}"/>
        <input type="hidden" name="SAMLResponse" value="{}"/>
      </div>
      <noscript><div><input type="submit" value="Continue"/></div></noscript>
    </form>
  </body>
</html>
"#,
        escape(action),
        escape(relay_state),
        escape(saml_response)
    )
}

/// Protected resource shown once the session is authenticated.
#[must_use]
pub fn portal_page() -> String {
    r#"<!DOCTYPE html>
<html>
  <head><title>Student Portal</title></head>
  <body><h1>Welcome</h1><p>You are signed in.</p></body>
</html>
"#
    .to_string()
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_form_embeds_error_only_when_requested() {
        assert!(!auth_form(None).contains("form-error"));
        let rejected = auth_form(Some("Bad <password>"));
        assert!(rejected.contains(r#"<p class="form-error">Bad &lt;password&gt;</p>"#));
    }

    #[test]
    fn storage_confirmation_has_no_credential_fields() {
        let page = storage_confirmation();
        assert!(!page.contains(r#"id="username""#));
        assert!(!page.contains(r#"id="password""#));
    }

    #[test]
    fn saml_post_form_escapes_values() {
        let page = saml_post_form("http://sp/acs?a=1&b=2", "relay", "resp");
        assert!(page.contains(r#"action="http://sp/acs?a=1&amp;b=2""#));
        assert!(portal_page().contains("Welcome"));
    }
}
