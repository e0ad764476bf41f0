use core::result;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

/// An Error that can occur in this crate
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Could not open filter wheel on {port}: {source}. \
         Check that the wheel is powered, the cable is connected and the serial driver is installed"
    )]
    Connection {
        port: String,
        source: serialport::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Filter wheel is not responding: expected {expected} bytes, {available} available after {waited:?}"
    )]
    DeviceNotResponding {
        expected: usize,
        available: u32,
        waited: Duration,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Serial(#[from] serialport::Error),

    #[error("Connection to the filter wheel is already closed")]
    Closed,

    #[error("Filter wheel actor is no longer running")]
    ActorGone,

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
