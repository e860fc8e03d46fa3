//! Spans that carry process-wide identifiers.

use tracing::Span;

use crate::init::build_sha;

/// Span wrapping one CLI command, tagged with the trace id and the build SHA
/// recorded by [`crate::init_logging`].
#[must_use]
pub fn command_span(name: &'static str, trace_id: &str) -> Span {
    tracing::info_span!(
        "command",
        name,
        trace_id = %trace_id,
        build_sha = %build_sha()
    )
}
