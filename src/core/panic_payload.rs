use std::{any::Any, error::Error, fmt::Write};

/// Render a panic payload for a log line.
///
/// Messages from `panic!` come out verbatim. Error values raised with
/// [`std::panic::panic_any`] are rendered with their whole `source()` chain,
/// e.g. `write failed: disk full`, as long as they are boxed as
/// `Box<dyn Error + Send + Sync>` or `Box<dyn Error + Send>`, or are a plain
/// `std::io::Error`. A concrete error type passed to `panic_any` unboxed,
/// like `panic_any(WriteFailed(..))`, cannot be recognised behind `Any` and
/// renders as `Box<dyn Any>`, as do payloads of any other type.
pub fn render_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(error) = payload.downcast_ref::<Box<dyn Error + Send + Sync>>() {
        render_error_chain(error.as_ref())
    } else if let Some(error) = payload.downcast_ref::<Box<dyn Error + Send>>() {
        render_error_chain(error.as_ref())
    } else if let Some(error) = payload.downcast_ref::<std::io::Error>() {
        render_error_chain(error)
    } else {
        "Box<dyn Any>".to_owned()
    }
}

fn render_error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(rendered, ": {cause}");
        source = cause.source();
    }
    rendered
}
