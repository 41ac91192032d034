use anyhow::Result;
use tracing::warn;

use crate::models::FetchError;

/// Run an upstream fetch, retrying it exactly once on failure.
///
/// A second failure is returned as a [`FetchError`] carrying the last error.
pub fn retry_once<T, F>(operation: &str, mut fetch: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T>,
{
    match fetch() {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(
                operation,
                attempt = 1,
                error = %format!("{first:#}"),
                "fetch failed, retrying once"
            );
            fetch().map_err(|last| FetchError {
                operation: operation.to_string(),
                last,
            })
        }
    }
}
