use std::future::Future;

use tokio::sync::OnceCell;

/// A connection created on first use and cached for the lifetime of its owner.
///
/// Concurrent callers of [`LazyConnection::get_or_connect`] share one
/// connection attempt. A failed attempt caches nothing, so the next call
/// tries again.
pub struct LazyConnection<T> {
    cell: OnceCell<T>,
}

impl<T> Default for LazyConnection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyConnection<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the cached connection, or run `connect` to create it.
    pub async fn get_or_connect<F, Fut, E>(&self, connect: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(connect).await
    }

    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
