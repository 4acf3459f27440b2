use serde::Serialize;

/// Wire-facing error taxonomy (spec section 7). Distinct from `anyhow::Error`,
/// which is used internally to build the `message` carried alongside a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Parse,
    State,
    ClockLag,
    Persistence,
    Fatal,
}

impl ErrorKind {
    /// Fatal errors terminate the race and close every session; everything
    /// else is reported but non-fatal.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Fatal)
    }
}
