// Utility functions for HexFog Core

/// Get current timestamp in milliseconds
pub fn now() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64
    }
}

/// Generate a unique ID (UUID v4)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Log to the browser console on WASM, stderr otherwise
pub fn console_log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{}", message);
}

/// Trailing-edge debouncer.
///
/// Each `schedule` cancels any pending deadline and re-arms it, so at most one
/// flush is pending per target operation. The host drives `tick` with its
/// clock; the last scheduled request is always eventually flushed, either by
/// the deadline expiring or by an explicit `flush`.
#[derive(Debug, Default)]
pub struct Debouncer {
    deadline: Option<i64>,
    delay_ms: i64,
}

impl Debouncer {
    pub fn new(delay_ms: i64) -> Debouncer {
        Debouncer {
            deadline: None,
            delay_ms,
        }
    }

    /// Arm (or re-arm) the deadline
    pub fn schedule(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when the armed deadline has passed
    pub fn tick(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Force the pending action to run now. Returns true if one was pending.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
