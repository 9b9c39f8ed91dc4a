//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): resolution and contract errors
//! - [`Lifecycle`](lifecycle::Lifecycle): resolver lifecycle states

pub mod context;
pub mod lifecycle;
pub mod neterror;
