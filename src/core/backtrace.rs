//! Panic-site backtraces.
//!
//! By the time a panic is caught the stack has already unwound, so a
//! backtrace taken at the recovery point only shows the middleware. A panic
//! hook records the backtrace of the panicking thread instead, and the
//! middleware picks it up from there.
//!
//! The hook records every panic on the thread, including ones the middleware
//! never sees. The slot is therefore cleared before each guarded call or poll,
//! so a recovery never reports a backtrace left over from an unrelated panic.
//! If another hook later replaces this one without chaining, recoveries fall
//! back to the stack at the recovery point.

use std::{
    backtrace::Backtrace,
    cell::RefCell,
    io::Write,
    panic,
    sync::Once,
};

thread_local! {
    static LAST_PANIC_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Install the capturing hook once per process. The previously installed
/// hook keeps running after the capture.
pub(crate) fn install_capture_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous_hook = panic::take_hook();

        panic::set_hook(Box::new(move |panic_info| {
            let _ = LAST_PANIC_BACKTRACE.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(Backtrace::force_capture());
                }
            });
            previous_hook(panic_info);
        }));
    });
}

/// Drop whatever backtrace an earlier panic on this thread left behind.
pub(crate) fn clear_panic_backtrace() {
    let _ = LAST_PANIC_BACKTRACE.try_with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            slot.take();
        }
    });
}

/// Backtrace of the last panic on this thread, or of the current stack when
/// none was recorded.
pub(crate) fn take_panic_backtrace() -> Backtrace {
    LAST_PANIC_BACKTRACE
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
        .unwrap_or_else(Backtrace::force_capture)
}

/// Write the panic-site backtrace to `out`. Failures to write are ignored.
pub(crate) fn print_panic_backtrace<W>(mut out: W)
where
    W: Write,
{
    let backtrace = take_panic_backtrace();
    let _ = writeln!(out, "{backtrace}");
}

#[cfg(test)]
pub(crate) fn has_panic_backtrace() -> bool {
    LAST_PANIC_BACKTRACE.with(|slot| slot.borrow().is_some())
}

#[cfg(test)]
mod tests {
    use std::{backtrace::BacktraceStatus, panic};

    use super::{
        clear_panic_backtrace, has_panic_backtrace, install_capture_hook, print_panic_backtrace,
        take_panic_backtrace, LAST_PANIC_BACKTRACE,
    };

    #[test]
    fn hook_records_backtrace_of_panicking_thread() {
        install_capture_hook();

        let result = panic::catch_unwind(|| panic!("captured"));

        assert!(result.is_err());
        assert!(LAST_PANIC_BACKTRACE.with(|slot| slot.borrow().is_some()));
        assert_eq!(take_panic_backtrace().status(), BacktraceStatus::Captured);
        assert!(LAST_PANIC_BACKTRACE.with(|slot| slot.borrow().is_none()));
    }

    #[test]
    fn falls_back_to_current_stack() {
        LAST_PANIC_BACKTRACE.with(|slot| slot.borrow_mut().take());

        assert_eq!(take_panic_backtrace().status(), BacktraceStatus::Captured);
    }

    #[test]
    fn clear_drops_backtrace_of_earlier_panic() {
        install_capture_hook();
        let _ = panic::catch_unwind(|| panic!("unrelated"));
        assert!(has_panic_backtrace());

        clear_panic_backtrace();

        assert!(!has_panic_backtrace());
    }

    #[test]
    fn print_writes_recorded_backtrace_and_drains_slot() {
        install_capture_hook();
        let _ = panic::catch_unwind(|| panic!("printed"));
        let mut out = Vec::new();

        print_panic_backtrace(&mut out);

        assert!(!out.is_empty());
        assert!(!has_panic_backtrace());
    }
}
