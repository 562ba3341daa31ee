use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// Use rppal in production
#[cfg(not(test))]
use rppal::uart::{Parity, Uart};

#[cfg(test)]
use crate::mocks::mock_uart::{Parity, Uart};

use tracing::{debug, error, info};

use crate::config::{SERIAL_BAUD, SERIAL_PATH, SERIAL_READ_TIMEOUT_MS};
use crate::error::NavError;
use crate::producer::FixProducer;

const READ_CHUNK: usize = 64;

/// The GPS receiver's UART, 8N1.
pub struct GpsSerial {
    uart: Uart,
    buf: [u8; READ_CHUNK],
}

impl GpsSerial {
    pub fn new() -> Result<Self, NavError> {
        Self::open(SERIAL_PATH, SERIAL_BAUD)
    }

    pub fn open(path: &str, baud: u32) -> Result<Self, NavError> {
        let mut uart = Uart::with_path(path, baud, Parity::None, 8, 1)?;
        // Return whatever has arrived once the timeout expires, even nothing.
        uart.set_read_mode(0, Duration::from_millis(SERIAL_READ_TIMEOUT_MS))?;
        info!("opened {} at {} baud", path, baud);
        Ok(Self {
            uart,
            buf: [0; READ_CHUNK],
        })
    }

    /// One read from the UART into the producer. Returns the number of bytes fed.
    pub fn poll(&mut self, producer: &mut FixProducer) -> Result<usize, NavError> {
        let n = self.uart.read(&mut self.buf)?;
        if n > 0 {
            producer.feed_bytes(&self.buf[..n]);
        }
        Ok(n)
    }

    /// Read until `stop` is set. Read errors are logged and retried; the
    /// published fixes simply go stale while the line is down.
    pub fn run(&mut self, producer: &mut FixProducer, stop: &AtomicBool) {
        let mut failing = false;
        while !stop.load(Ordering::Relaxed) {
            match self.poll(producer) {
                Ok(_) if failing => {
                    debug!("serial reads recovered");
                    failing = false;
                }
                Ok(_) => {}
                Err(e) => {
                    if !failing {
                        error!("serial read failed: {}", e);
                        failing = true;
                    }
                    std::thread::sleep(Duration::from_millis(SERIAL_READ_TIMEOUT_MS));
                }
            }
        }
    }
}
