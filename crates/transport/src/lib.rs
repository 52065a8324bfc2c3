//! Transport abstraction for slackhook.
//!
//! A [`Transport`] receives log records and forwards them somewhere without
//! blocking the caller. Transports are built through a [`TransportRegistry`]
//! keyed by driver name and can be attached to `tracing` with
//! [`TransportLayer`].

pub mod error;
pub mod layer;
pub mod registry;
pub mod transport;

pub use error::TransportError;
pub use layer::{TransportLayer, syslog_level};
pub use registry::{TransportFactory, TransportRegistry};
pub use transport::{DropReason, LogDispatch, Transport, TransportEvent};
