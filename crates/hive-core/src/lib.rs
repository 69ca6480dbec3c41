//! Hive Core - data model, event model, execution lifecycle, and error handling

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use events::*;
pub use lifecycle::*;
pub use types::*;
