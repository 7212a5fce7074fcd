use actix_web::{dev::ServiceRequest, middleware::Logger};

use crate::RequestIdExtract;

pub trait RequestIdVariable {
    /// Makes `%{request-id}xi` available in the `Logger` format, rendering
    /// `-` for requests without an ID.
    fn add_request_id(self) -> Self;
}

impl RequestIdVariable for Logger {
    fn add_request_id(self) -> Self {
        self.custom_request_replace("request-id", request_id_or_dash)
    }
}

fn request_id_or_dash(req: &ServiceRequest) -> String {
    req.request_id()
        .map(|request_id| request_id.to_string())
        .unwrap_or_else(|| "-".to_owned())
}
