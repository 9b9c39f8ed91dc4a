//! Ergonomic error context helpers.
//!
//! Provides extension traits for turning lookup failures into
//! context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add DNS resolution context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use chanresolve::base::context::IoResultExt;
    ///
    /// let addrs = ("example.com", 0).to_socket_addrs().dns_context("example.com")?;
    /// // Error: "Name example.com not resolved: ..."
    /// ```
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }
}

/// Extension trait for lookups that produce an address list.
pub trait AddrsResultExt<T> {
    /// Reject an empty address list as a failed lookup for `domain`.
    fn non_empty(self, domain: &str) -> Result<Vec<T>, NetError>;
}

impl<T> AddrsResultExt<T> for Result<Vec<T>, NetError> {
    fn non_empty(self, domain: &str) -> Result<Vec<T>, NetError> {
        let addrs = self?;
        if addrs.is_empty() {
            return Err(NetError::dns_failed(
                domain,
                io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
            ));
        }
        Ok(addrs)
    }
}
