//! Probe engine: resolves a service's interface artifacts, loads them in an
//! isolated namespace and invokes one of its methods generically.
//!
//! [`Harness`] drives the whole pipeline; the modules below can also be used
//! on their own.

pub mod cache;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod harness;
pub mod invoker;
pub mod loader;
pub mod namespace;
pub mod overload;
pub mod realize;
pub mod request;
pub mod resolver;
pub mod transport;
pub mod types;

pub use config::HarnessConfig;
pub use coordinate::PackageCoordinate;
pub use error::{Error, Result};
pub use harness::Harness;
pub use invoker::InvocationOutcome;
pub use request::RequestBody;
