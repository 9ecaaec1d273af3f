//! Session-gated action dispatch for the records tablet.
//!
//! A request passes the identity gate, obtains a store handle, and is then
//! either routed to exactly one registered [`ActionHandler`] or handed to the
//! [`ViewRenderer`].

pub mod credentials;
pub mod dispatcher;
pub mod gate;
pub mod handler;
pub mod handlers;
pub mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher, ViewRenderer};
pub use gate::{authorize, AuthResult, Session};
pub use handler::ActionHandler;
pub use handlers::standard_registry;
pub use registry::{ActionRegistry, HandlerRef, RegistryBuilder, RegistryError};
