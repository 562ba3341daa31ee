// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::HashMap;

use rppal::gpio::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Low,
    High,
}

thread_local! {
    // Levels forced by a test. A pin nobody has driven floats high on its pull-up.
    static DRIVEN: RefCell<HashMap<u8, Level>> = RefCell::new(HashMap::new());
}

fn level_of(pin: u8) -> Level {
    DRIVEN.with(|driven| driven.borrow().get(&pin).copied().unwrap_or(Level::High))
}

pub struct Gpio;

impl Gpio {
    pub fn new() -> Result<Self> {
        Ok(Gpio)
    }

    pub fn get(&self, pin: u8) -> Result<Pin> {
        Ok(Pin(pin))
    }
}

pub struct Pin(u8);

impl Pin {
    pub fn into_input_pullup(self) -> InputPin {
        InputPin(self.0)
    }
}

/// The cycle button's input line.
pub struct InputPin(u8);

impl InputPin {
    pub fn read(&self) -> Level {
        level_of(self.0)
    }
}

/// Drive `pin` as the button would: `Low` while held, `High` when released.
pub fn set_mock_pin_level(pin: u8, level: Level) {
    DRIVEN.with(|driven| {
        driven.borrow_mut().insert(pin, level);
    });
}

/// Release every pin back to its pull-up.
pub fn reset_mock_pins() {
    DRIVEN.with(|driven| driven.borrow_mut().clear());
}
