//! Driver for a serial filter wheel that follows configuration changes of
//! another device.
//!
//! [`wheel::FilterWheel`] speaks the wheel's single-byte protocol over any
//! [`transport::Transport`]. [`bus::WheelRef`] owns a wheel on its own task and
//! is how event sources talk to it.

pub mod api;
pub mod bus;
pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod transport;
pub mod wheel;

pub use error::{Error, Result};
