//! Actix-web middleware that recovers from panics raised while a request is
//! being handled.
//!
//! Wrap an app (or a scope) with [`Recovery`] and a panicking handler no
//! longer takes the connection down with it: the panic is logged, prefixed
//! with the request ID when one is known, the panic-site backtrace goes to
//! stderr and the client gets a `500 Internal Server Error`.
//!
//! ```no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_recovery::Recovery;
//!
//! async fn index() -> &'static str {
//!     panic!("boom")
//! }
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(Recovery::default())
//!             .route("/", web::get().to(index))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```

mod core;
#[cfg(feature = "logger")]
mod logger;

pub(crate) use crate::core::config::Config;
pub use crate::core::{
    body::{BodyPanicked, RecoverBody},
    logging::{LogPanicLogger, PanicLogger},
    middleware::{RecoveredPanic, Recovery, RecoveryMiddleware},
    panic_payload::render_panic_payload,
    request_id::{
        ExtensionRequestId, HeaderRequestId, RequestId, RequestIdError, RequestIdExtract,
        RequestIdLookup,
    },
};
#[cfg(feature = "logger")]
pub use crate::logger::RequestIdVariable;
