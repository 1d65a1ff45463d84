//! etcvault proxy library.
//!
//! Sits in front of an etcd cluster and rewrites traffic so that
//! sentinel-wrapped values are encrypted at rest: form `value` fields are
//! encrypted on the way in, JSON node values are decrypted on the way out.
//! Backends are discovered from DNS SRV records or from the cluster's own
//! members API, and each backend carries an availability flag with
//! exponential cool-down after transport failures.

pub mod backend;
pub mod config;
pub mod discovery;
pub mod error;
pub mod proxy;
pub mod readonly;
pub mod router;

pub use backend::Backend;
pub use config::ProxyConfig;
pub use error::{DiscoveryError, RouterError};
pub use proxy::Proxy;
pub use router::{BackendSource, Router};
