//! Concrete [`ReferenceFactory`](crate::invoker::ReferenceFactory) implementations.

mod telnet;

pub use self::telnet::{DEFAULT_PORT, TelnetReferenceFactory, TelnetService, parse_telnet_reply};
