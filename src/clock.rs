/// Time sources for grouping and activity bookkeeping
use std::cell::Cell;

/// Wall clock as the extension sees it
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> f64;

    /// Hour of day (0-23) in the user's local time zone
    fn local_hour(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }

    fn local_hour(&self) -> u32 {
        (**self).local_hour()
    }
}

/// Reads `Date` from the JS host. Only callable on wasm32.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn local_hour(&self) -> u32 {
        js_sys::Date::new_0().get_hours()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    hour: Cell<u32>,
}

impl ManualClock {
    pub fn new(now_ms: f64, hour: u32) -> Self {
        ManualClock {
            now: Cell::new(now_ms),
            hour: Cell::new(hour % 24),
        }
    }

    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.set(hour % 24);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }

    fn local_hour(&self) -> u32 {
        self.hour.get()
    }
}
