//! In-memory stand-in for the wheel.
//!
//! [`MockWheel`] is the transport handed to the driver; [`MockHandle`] stays
//! with the caller and observes what crossed the wire. Both share one device.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::transport::Transport;
use crate::wheel::{ACK_LEN, INIT_COMMAND};
use crate::Result;

/// How the simulated device answers a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responder {
    Acknowledge,
    Silent,
    /// One byte short of a full acknowledgment
    Short,
}

#[derive(Debug)]
struct Device {
    responder: Responder,
    /// Polls before queued bytes show up
    latency: u32,
    polls_since_write: u32,
    pending: VecDeque<u8>,
    written: Vec<u8>,
    reads: Vec<usize>,
    slot: u8,
    released: usize,
}

pub struct MockWheel {
    device: Arc<Mutex<Device>>,
}

#[derive(Clone)]
pub struct MockHandle {
    device: Arc<Mutex<Device>>,
}

fn lock(device: &Mutex<Device>) -> MutexGuard<'_, Device> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockWheel {
    pub fn new() -> (MockWheel, MockHandle) {
        Self::with_responder(Responder::Acknowledge)
    }

    pub fn with_responder(responder: Responder) -> (MockWheel, MockHandle) {
        let device = Arc::new(Mutex::new(Device {
            responder,
            latency: 0,
            polls_since_write: 0,
            pending: VecDeque::new(),
            written: Vec::new(),
            reads: Vec::new(),
            slot: 0,
            released: 0,
        }));
        (
            MockWheel {
                device: device.clone(),
            },
            MockHandle { device },
        )
    }
}

impl Drop for MockWheel {
    fn drop(&mut self) {
        lock(&self.device).released += 1;
    }
}

impl Read for MockWheel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut device = lock(&self.device);
        if device.polls_since_write < device.latency {
            return Ok(0);
        }
        let n = buf.len().min(device.pending.len());
        for (dst, src) in buf.iter_mut().zip(device.pending.drain(..n)) {
            *dst = src;
        }
        device.reads.push(n);
        Ok(n)
    }
}

impl Write for MockWheel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut device = lock(&self.device);
        for &byte in buf {
            device.written.push(byte);
            if byte != INIT_COMMAND {
                device.slot = byte & 0x0f;
            }
            let reply = match device.responder {
                Responder::Acknowledge => ACK_LEN,
                Responder::Short => ACK_LEN - 1,
                Responder::Silent => 0,
            };
            device.pending.extend(std::iter::repeat(byte).take(reply));
        }
        device.polls_since_write = 0;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockWheel {
    fn bytes_to_read(&mut self) -> Result<u32> {
        let mut device = lock(&self.device);
        if device.polls_since_write < device.latency {
            device.polls_since_write += 1;
            return Ok(0);
        }
        Ok(device.pending.len() as u32)
    }
}

impl MockHandle {
    pub fn set_responder(&self, responder: Responder) {
        lock(&self.device).responder = responder;
    }

    pub fn set_latency(&self, polls: u32) {
        lock(&self.device).latency = polls;
    }

    /// Every byte the driver has written, in order.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.device).written.clone()
    }

    /// Size of each completed read.
    pub fn reads(&self) -> Vec<usize> {
        lock(&self.device).reads.clone()
    }

    /// The slot the device was last told to go to.
    pub fn slot(&self) -> u8 {
        lock(&self.device).slot
    }

    pub fn released(&self) -> usize {
        lock(&self.device).released
    }

    /// Forget traffic seen so far.
    pub fn clear(&self) {
        let mut device = lock(&self.device);
        device.written.clear();
        device.reads.clear();
    }
}
