//! Command handlers, one module per subcommand.

pub(crate) mod fetch;
pub(crate) mod login;
