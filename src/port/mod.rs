//! Transport abstraction
//!
//! The [`Port`] trait is the boundary to the platform UART and timer.
//! [`SerialPort`] implements it over `embedded-hal` serial peripherals.

/// `embedded-hal` serial adapter
pub mod serial;

/// Transport traits
pub mod traits;

pub use serial::{Clock, SerialPort};
pub use traits::{Port, ReadError};
