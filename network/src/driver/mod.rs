//! Driver abstraction module.
//!
//! The stack never touches controller registers; it only sees frames
//! through the `NetworkDriver` trait.

pub mod traits;

pub use traits::{NetworkDriver, RxError, TxError};
