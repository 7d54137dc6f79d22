//! Utilities for working with panic payloads.
//!
//! These helpers aid in extracting useful information from `panic!` payloads
//! for logging and diagnostics. [`install_backtrace_hook`] chains a panic hook
//! that records a backtrace for the panicking thread so code catching the
//! unwind can log where the fault happened, not just where it was caught.

use std::{
    any::Any,
    backtrace::Backtrace,
    cell::RefCell,
    fmt,
    panic,
    sync::Once,
};

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to `Debug` formatting otherwise.
///
/// ```
/// use wirelink::panic::format_panic;
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(
///     format_panic(Box::new(String::from("boom"))).to_string(),
///     "boom"
/// );
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Create a [`PanicMessage`] for the given payload.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

thread_local! {
    static LAST_PANIC_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chain a panic hook that records the panicking thread's backtrace.
///
/// The previously installed hook still runs. Calling this more than once has
/// no further effect.
pub fn install_backtrace_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture();
            LAST_PANIC_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

/// Take the backtrace recorded by the most recent panic on this thread.
///
/// Returns `None` if [`install_backtrace_hook`] was never called or the
/// backtrace has already been taken.
#[must_use]
pub fn take_panic_backtrace() -> Option<Backtrace> {
    LAST_PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_records_backtrace_for_caught_panic() {
        install_backtrace_hook();
        let _ = take_panic_backtrace();

        let payload = panic::catch_unwind(|| panic!("recorded")).expect_err("closure panics");
        assert_eq!(format_panic(payload).to_string(), "recorded");

        assert!(take_panic_backtrace().is_some());
        assert!(
            take_panic_backtrace().is_none(),
            "backtrace should be consumed by the first take"
        );
    }

    #[test]
    fn installing_twice_is_harmless() {
        install_backtrace_hook();
        install_backtrace_hook();
        let payload = panic::catch_unwind(|| std::panic::panic_any(7_u8)).expect_err("panics");
        assert!(format_panic(payload).to_string().contains("Any"));
        assert!(take_panic_backtrace().is_some());
    }
}
