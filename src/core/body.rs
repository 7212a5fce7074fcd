use std::{
    error::Error as StdError,
    fmt,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use actix_web::{
    body::{BodySize, MessageBody},
    web::Bytes,
};

use crate::{
    core::{backtrace::clear_panic_backtrace, middleware::report_panic},
    Config, RequestId,
};

/// Error yielded by [`RecoverBody`] after the wrapped body panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPanicked;

impl fmt::Display for BodyPanicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response body panicked")
    }
}

impl StdError for BodyPanicked {}

/// Response body wrapper that guards the streaming phase of a response.
///
/// Status and headers are already on the wire once the body is polled, so a
/// panic here cannot become a 500 anymore. The panic is reported like any
/// other and the body fails with [`BodyPanicked`], which makes the server
/// abort the truncated response. Chunks, size and errors of a body that does
/// not panic pass through untouched.
pub struct RecoverBody<B> {
    body: Pin<Box<B>>,
    panicked: bool,
    request_id: Option<RequestId>,
    config: Rc<Config>,
}

impl<B> RecoverBody<B> {
    pub(crate) fn new(body: B, request_id: Option<RequestId>, config: Rc<Config>) -> Self {
        Self {
            body: Box::pin(body),
            panicked: false,
            request_id,
            config,
        }
    }
}

impl<B> fmt::Debug for RecoverBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoverBody")
            .field("panicked", &self.panicked)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl<B> MessageBody for RecoverBody<B>
where
    B: MessageBody,
{
    type Error = Box<dyn StdError>;

    fn size(&self) -> BodySize {
        self.body.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let this = self.get_mut();

        if this.panicked {
            return Poll::Ready(None);
        }

        clear_panic_backtrace();
        let body = &mut this.body;
        match panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll_next(cx))) {
            Ok(poll) => poll.map(|chunk| chunk.map(|result| result.map_err(Into::into))),
            Err(payload) => {
                this.panicked = true;
                report_panic(&this.config, this.request_id.as_ref(), payload.as_ref());
                Poll::Ready(Some(Err(Box::new(BodyPanicked))))
            }
        }
    }
}
