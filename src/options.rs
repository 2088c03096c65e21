/// Configures request timeout and the default schema profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    ///
    /// An elapsed timeout is reported as [`PostgrestError::Transport`](crate::PostgrestError::Transport)
    /// wrapping a `reqwest::Error` with `is_timeout()`. Use
    /// `execute_with_cancellation` or `execute_discard_with_cancellation` to get
    /// [`PostgrestError::Cancelled`](crate::PostgrestError::Cancelled) instead.
    pub timeout_ms: u64,
    /// Schema sent as `Accept-Profile` and `Content-Profile`.
    pub schema: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            schema: "public".to_owned(),
        }
    }
}
