//! Request middleware layered in front of the proxy.
//!
//! [`request_id`] binds a correlation token to each request and must be
//! the outer layer; [`logging`] emits the start/finish records and runs
//! inside it.

pub mod logging;
pub mod request_id;
