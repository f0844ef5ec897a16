use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The external executor reported a failure for a dispatched action.
    /// Never retried; optimistic state is left untouched.
    #[error("Action '{action}' failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}
