// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use rppal::uart::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parity {
    None,
}

thread_local! {
    static MOCK_RX: RefCell<VecDeque<u8>> = const { RefCell::new(VecDeque::new()) };
    static MOCK_OPENED: RefCell<Option<(String, u32)>> = const { RefCell::new(None) };
}

pub struct Uart {
    _parity: Parity,
}

impl Uart {
    pub fn with_path<P: AsRef<Path>>(
        path: P,
        baud_rate: u32,
        parity: Parity,
        _data_bits: u8,
        _stop_bits: u8,
    ) -> Result<Self> {
        let path = path.as_ref().display().to_string();
        MOCK_OPENED.with(|opened| *opened.borrow_mut() = Some((path, baud_rate)));
        Ok(Uart { _parity: parity })
    }

    pub fn set_read_mode(&mut self, _min_length: u8, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    /// Drains up to `buffer.len()` queued bytes; an empty queue reads as a timeout.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        MOCK_RX.with(|rx| {
            let mut rx = rx.borrow_mut();
            let n = buffer.len().min(rx.len());
            for (slot, byte) in buffer.iter_mut().zip(rx.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        })
    }
}

// test helper to queue bytes as if the receiver sent them
pub fn push_mock_bytes(bytes: &[u8]) {
    MOCK_RX.with(|rx| rx.borrow_mut().extend(bytes.iter().copied()));
}

// test helper: path and baud of the last opened port
pub fn opened_with() -> Option<(String, u32)> {
    MOCK_OPENED.with(|opened| opened.borrow().clone())
}

// test helper to reset the mock port
pub fn reset_mock_uart() {
    MOCK_RX.with(|rx| rx.borrow_mut().clear());
    MOCK_OPENED.with(|opened| *opened.borrow_mut() = None);
}
