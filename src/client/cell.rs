//! Lazily-initialised home for the one client of a process.

use std::sync::OnceLock;

use super::{HttpTransport, QueryClient, Transport};

/// Holds at most one [`QueryClient`], created on first use.
///
/// Pagination accumulates into the client's cache, so building a second
/// client would silently drop pages already loaded. The composition root owns
/// the cell and hands the client to whoever needs it.
pub struct ClientCell<T = HttpTransport> {
    cell: OnceLock<QueryClient<T>>,
}

impl<T: Transport> ClientCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&QueryClient<T>> {
        self.cell.get()
    }

    /// Return the client, creating it with `init` on the first call.
    pub fn get_or_init(&self, init: impl FnOnce() -> QueryClient<T>) -> &QueryClient<T> {
        self.cell.get_or_init(init)
    }

    /// Fallible variant of [`ClientCell::get_or_init`].
    ///
    /// # Errors
    ///
    /// Returns the error from `init`; the cell stays empty in that case.
    pub fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<QueryClient<T>, E>,
    ) -> Result<&QueryClient<T>, E> {
        if let Some(client) = self.cell.get() {
            return Ok(client);
        }
        let client = init()?;
        Ok(self.cell.get_or_init(|| client))
    }
}

impl<T: Transport> Default for ClientCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
