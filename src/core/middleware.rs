use std::{
    any::Any,
    fmt,
    future::{ready, Future, Ready},
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    task::{Context, Poll},
};

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpResponse, ResponseError,
};
use futures::{
    future::{poll_fn, Either, LocalBoxFuture},
    FutureExt,
};

use crate::{
    core::backtrace::{clear_panic_backtrace, install_capture_hook, print_panic_backtrace},
    render_panic_payload, Config, PanicLogger, RecoverBody, RequestId, RequestIdLookup,
};

pub struct Recovery {
    config: Rc<Config>,
}

impl Recovery {
    /// Use the provided logger for recovered panics instead of the default
    /// one, which writes through the `log` facade.
    pub fn with_logger<L>(mut self, logger: L) -> Self
    where
        L: PanicLogger + 'static,
    {
        self.modify_config(|cfg| cfg.logger = Box::new(logger));
        self
    }

    /// Use the provided lookup to find the request ID that prefixes the
    /// panic log line.
    pub fn with_request_id_lookup<L>(mut self, request_id_lookup: L) -> Self
    where
        L: RequestIdLookup + 'static,
    {
        self.modify_config(|cfg| cfg.request_id_lookup = Box::new(request_id_lookup));
        self
    }

    fn modify_config<M>(&mut self, modification: M)
    where
        M: FnOnce(&mut Config),
    {
        if let Some(cfg) = Rc::get_mut(&mut self.config) {
            modification(cfg);
        }
    }
}

impl Default for Recovery {
    /// Creates the default instance of `Recovery` with the following configuration:
    ///
    /// * logger: `log::error!` through the `log` facade,
    /// * request ID lookup: [`RequestId`] from the request extensions.
    fn default() -> Self {
        Self {
            config: Rc::new(Config::default()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Recovery
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<RecoverBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoveryMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        install_capture_hook();

        ready(Ok(RecoveryMiddleware {
            service,
            config: Rc::clone(&self.config),
        }))
    }
}

pub struct RecoveryMiddleware<S> {
    service: S,
    config: Rc<Config>,
}

impl<S, B> Service<ServiceRequest> for RecoveryMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<RecoverBody<B>>;
    type Error = Error;
    type Future = Either<
        Ready<Result<ServiceResponse<RecoverBody<B>>, Error>>,
        LocalBoxFuture<'static, Result<ServiceResponse<RecoverBody<B>>, Error>>,
    >;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, request: ServiceRequest) -> Self::Future {
        let request_id = self
            .config
            .request_id_lookup
            .lookup(&request)
            .filter(|request_id| !request_id.is_empty());

        clear_panic_backtrace();
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(request))) {
            Ok(fut) => fut,
            Err(payload) => {
                report_panic(&self.config, request_id.as_ref(), payload.as_ref());
                return Either::Left(ready(Err(RecoveredPanic.into())));
            }
        };
        let config = Rc::clone(&self.config);
        let mut fut = Box::pin(fut);
        let guarded = poll_fn(move |cx| {
            clear_panic_backtrace();
            fut.as_mut().poll(cx)
        });

        Either::Right(
            async move {
                match AssertUnwindSafe(guarded).catch_unwind().await {
                    Ok(result) => result.map(|response| {
                        response.map_body(|_, body| RecoverBody::new(body, request_id, config))
                    }),
                    Err(payload) => {
                        report_panic(&config, request_id.as_ref(), payload.as_ref());
                        Err(RecoveredPanic.into())
                    }
                }
            }
            .boxed_local(),
        )
    }
}

/// The error a request resolves to after its handler panicked.
///
/// Middleware wrapped around [`Recovery`] receives it as an `Err`, not as a
/// response; actix-web renders it as `500 Internal Server Error` with an
/// empty body when it writes the response. Middleware that only acts on
/// `Ok` responses, such as the access `Logger`, skips these requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveredPanic;

impl fmt::Display for RecoveredPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request handler panicked")
    }
}

impl std::error::Error for RecoveredPanic {}

impl ResponseError for RecoveredPanic {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::new(self.status_code())
    }
}

/// Log a recovered panic and dump the panic-site backtrace to stderr.
pub(crate) fn report_panic(
    config: &Config,
    request_id: Option<&RequestId>,
    payload: &(dyn Any + Send),
) {
    report_panic_to(config, request_id, payload, io::stderr().lock());
}

fn report_panic_to<W>(
    config: &Config,
    request_id: Option<&RequestId>,
    payload: &(dyn Any + Send),
    backtrace_out: W,
) where
    W: Write,
{
    config
        .logger
        .log_panic(&panic_log_line(request_id, payload));
    print_panic_backtrace(backtrace_out);
}

fn panic_log_line(request_id: Option<&RequestId>, payload: &(dyn Any + Send)) -> String {
    let rendered = render_panic_payload(payload);
    match request_id {
        Some(request_id) => format!("[{request_id}] panic: {rendered}"),
        None => format!("panic: {rendered}"),
    }
}
