use std::{fmt, io};

use actix_web::{
    dev::Service,
    http::header::{ContentType, HeaderName},
    middleware::Logger,
    web::{self, Bytes},
    App, HttpMessage, HttpResponse, HttpServer,
};
use actix_web_recovery::{Recovery, RequestId, RequestIdVariable};
use futures::{stream, StreamExt};

#[derive(Debug)]
struct StorageError(io::Error);

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to persist upload")
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("still serving")
}

async fn boom() -> HttpResponse {
    panic!("boom")
}

async fn upload() -> HttpResponse {
    let error: Box<dyn std::error::Error + Send + Sync> = Box::new(StorageError(
        io::Error::new(io::ErrorKind::Other, "disk full"),
    ));
    std::panic::panic_any(error)
}

async fn stream_then_panic() -> HttpResponse {
    let chunks = stream::iter(0..2).map(|n| match n {
        0 => Ok::<_, io::Error>(Bytes::from_static(b"partial body")),
        _ => panic!("stream broke"),
    });
    HttpResponse::Ok().streaming(chunks)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    HttpServer::new(move || {
        App::new()
            .wrap(Recovery::default())
            // Panicked requests reach the access logger as an `Err` and are not
            // logged there; the `[request-id] panic: ...` line covers them.
            .wrap(
                Logger::new("%{request-id}xi %a \"%r\" %s %b \"%{User-Agent}i\" %T")
                    .add_request_id(),
            )
            // Stand-in for a real request-ID middleware.
            .wrap_fn(|req, srv| {
                let request_id = req
                    .headers()
                    .get(HeaderName::from_static("x-request-id"))
                    .and_then(|value| RequestId::try_from(value.as_bytes()).ok());
                if let Some(request_id) = request_id {
                    req.extensions_mut().insert(request_id);
                }
                srv.call(req)
            })
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/boom").route(web::get().to(boom)))
            .service(web::resource("/upload").route(web::post().to(upload)))
            .service(web::resource("/stream").route(web::get().to(stream_then_panic)))
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await
}
