//! Request description: the immutable spec, its editable fields, payload
//! escaping and the optional proxy.

pub mod escape;
mod proxy;
mod spec;

pub use proxy::ProxyConfig;
pub use spec::{RequestFields, RequestSpec};
