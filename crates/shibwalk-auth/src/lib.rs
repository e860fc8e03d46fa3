#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shibboleth (SAML 2.0 POST binding) login driver.
//!
//! Walks a credential through the identity provider's redirect dance and leaves the
//! resulting cookies in a caller-owned [`Session`].
//!
//! Layout: `validate.rs` (username shape), `defaults.rs` (fixed endpoint and form
//! keys), `model.rs` (credential, form bundles, `ProtocolConfig`), `session.rs`
//! (cookie-bearing HTTP client), `interpret.rs` (HTML inspection behind
//! `ResponseInterpreter`), `driver.rs` (the login state machine), `authenticator.rs`
//! (the stateful facade).

pub mod authenticator;
pub mod defaults;
pub mod driver;
pub mod error;
pub mod interpret;
pub mod model;
pub mod session;
pub mod validate;

pub use authenticator::Authenticator;
pub use driver::{LoginOutcome, login};
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use interpret::{ExtractedAssertion, ResponseInterpreter, ShibbolethInterpreter};
pub use model::{Credential, FormParams, ProtocolConfig};
pub use session::{Session, SessionSettings};
pub use validate::validate_username;
