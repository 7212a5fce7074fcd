/// Receives the formatted line describing a recovered panic.
///
/// The line is already complete, e.g. `[req-123] panic: boom`. Loggers that
/// are shared between workers must tolerate concurrent calls.
pub trait PanicLogger {
    fn log_panic(&self, line: &str);
}

impl<F> PanicLogger for F
where
    F: Fn(&str),
{
    fn log_panic(&self, line: &str) {
        self(line)
    }
}

/// Default [`PanicLogger`]: emits the line through the `log` facade at
/// `error` level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogPanicLogger;

impl PanicLogger for LogPanicLogger {
    fn log_panic(&self, line: &str) {
        log::error!(target: "actix_web_recovery", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::{LogPanicLogger, PanicLogger};

    #[test]
    fn closure_receives_line() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        let logger = move |line: &str| sink.borrow_mut().push(line.to_owned());

        logger.log_panic("panic: boom");

        assert_eq!(*lines.borrow(), vec!["panic: boom".to_string()]);
    }

    #[test]
    fn default_logger_does_not_require_a_backend() {
        LogPanicLogger.log_panic("panic: nobody listens");
    }
}
