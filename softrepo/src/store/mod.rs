//! Storage abstraction and the in-memory reference store

mod memory;
mod traits;

use std::future::Future;

use tokio_util::sync::CancellationToken;

pub use memory::MemoryStore;
pub use traits::{Change, ChangeKind, ChangeSet, Fetched, Store};

use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Race a store call against a cancellation token
///
/// Cancellation wins ties, so a token cancelled before the call starts never
/// lets the call run.
pub(crate) async fn cancellable<F, R>(
    cancel: &CancellationToken,
    operation: RepositoryOperation,
    call: F,
) -> RepositoryResult<R>
where
    F: Future<Output = RepositoryResult<R>>,
{
    tokio::select! {
        biased;

        () = cancel.cancelled() => {
            tracing::debug!(%operation, "Store call cancelled");
            Err(RepositoryError::cancelled(operation))
        }
        result = call => result,
    }
}
