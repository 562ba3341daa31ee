use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// Use rppal in production
#[cfg(not(test))]
use rppal::gpio::{Gpio, InputPin, Level};

#[cfg(test)]
// This is only used in testing, not compiled in release.
use crate::mocks::mock_gpio::{Gpio, InputPin, Level};

use tracing::info;

use crate::config::{BUTTON_DEBOUNCE_MS, BUTTON_POLL_PERIOD_MS, GPIO_CYCLE_BUTTON};
use crate::error::NavError;
use crate::shared::SharedState;

/// Momentary push button, wired to ground with the internal pull-up enabled.
/// Each press advances the current mark.
pub struct CycleButton {
    pin: InputPin,
    was_pressed: bool,
    last_press: Option<Instant>,
    debounce: Duration,
}

impl CycleButton {
    pub fn new() -> Result<Self, NavError> {
        Self::with_pin(GPIO_CYCLE_BUTTON)
    }

    pub fn with_pin(pin: u8) -> Result<Self, NavError> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(pin)?.into_input_pullup();

        Ok(Self {
            pin,
            was_pressed: false,
            last_press: None,
            debounce: Duration::from_millis(BUTTON_DEBOUNCE_MS),
        })
    }

    pub fn is_pressed(&self) -> bool {
        self.pin.read() == Level::Low
    }

    /// True once per press, on the falling edge. Edges within the debounce
    /// interval of the previous press are ignored.
    pub fn poll(&mut self, now: Instant) -> bool {
        let pressed = self.is_pressed();
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;

        if !edge {
            return false;
        }
        if let Some(last) = self.last_press {
            if now.duration_since(last) < self.debounce {
                return false;
            }
        }
        self.last_press = Some(now);
        true
    }

    /// Poll until `stop` is set, cycling the shared target on every press.
    pub fn run(&mut self, shared: &SharedState, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if self.poll(Instant::now()) {
                let target = shared.cycle_target();
                info!("target is now {}", target);
            }
            thread::sleep(Duration::from_millis(BUTTON_POLL_PERIOD_MS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MARKS;
    use crate::mocks::mock_gpio;
    use std::error::Error;

    fn press(button: &mut CycleButton, at: Instant) -> bool {
        mock_gpio::set_mock_pin_level(GPIO_CYCLE_BUTTON, mock_gpio::Level::Low);
        button.poll(at)
    }

    fn release(button: &mut CycleButton, at: Instant) -> bool {
        mock_gpio::set_mock_pin_level(GPIO_CYCLE_BUTTON, mock_gpio::Level::High);
        button.poll(at)
    }

    #[test]
    fn test_starts_released() -> Result<(), Box<dyn Error>> {
        mock_gpio::reset_mock_pins();
        let mut button = CycleButton::new()?;
        assert!(!button.is_pressed());
        assert!(!button.poll(Instant::now()));
        Ok(())
    }

    #[test]
    fn test_one_event_per_press() -> Result<(), Box<dyn Error>> {
        mock_gpio::reset_mock_pins();
        let mut button = CycleButton::new()?;
        let t0 = Instant::now();

        assert!(press(&mut button, t0));
        // Held down across several polls.
        assert!(!button.poll(t0 + Duration::from_millis(20)));
        assert!(!button.poll(t0 + Duration::from_millis(40)));
        assert!(!release(&mut button, t0 + Duration::from_millis(60)));
        assert!(press(&mut button, t0 + Duration::from_millis(500)));
        Ok(())
    }

    #[test]
    fn test_bounce_is_ignored() -> Result<(), Box<dyn Error>> {
        mock_gpio::reset_mock_pins();
        let mut button = CycleButton::new()?;
        let t0 = Instant::now();

        assert!(press(&mut button, t0));
        assert!(!release(&mut button, t0 + Duration::from_millis(5)));
        assert!(!press(&mut button, t0 + Duration::from_millis(10)));
        assert!(!release(&mut button, t0 + Duration::from_millis(15)));
        assert!(press(&mut button, t0 + Duration::from_millis(BUTTON_DEBOUNCE_MS + 10)));
        Ok(())
    }

    #[test]
    fn test_presses_cycle_targets() -> Result<(), Box<dyn Error>> {
        mock_gpio::reset_mock_pins();
        let shared = SharedState::new(&MARKS)?;
        let mut button = CycleButton::new()?;
        let t0 = Instant::now();

        for i in 0..3u64 {
            let at = t0 + Duration::from_secs(i);
            if press(&mut button, at) {
                shared.cycle_target();
            }
            release(&mut button, at + Duration::from_millis(100));
        }
        assert_eq!(shared.current_target().name, "NAS2");
        Ok(())
    }
}
