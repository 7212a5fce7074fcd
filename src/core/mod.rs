pub(crate) mod backtrace;
pub(crate) mod body;
pub(crate) mod config;
pub(crate) mod logging;
pub(crate) mod middleware;
pub(crate) mod panic_payload;
pub(crate) mod request_id;
