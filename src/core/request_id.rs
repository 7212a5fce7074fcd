use actix_web::{
    dev::ServiceRequest,
    http::header::{HeaderName, HeaderValue},
    HttpMessage,
};
use std::{fmt, ops::Deref, str::FromStr};

/// Correlation identifier of a single inbound request.
///
/// Produced by whatever request-ID mechanism runs in front of
/// [`Recovery`](crate::Recovery); this crate only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    /// Attempt to convert a string to a `RequestId`.
    ///
    /// Only visible ASCII characters (32 - 127) are permitted as argument.
    /// At least one character is required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.as_bytes())
    }
}

impl TryFrom<&[u8]> for RequestId {
    type Error = RequestIdError;

    /// Attempt to convert a byte array to a `RequestId`.
    ///
    /// Only visible ASCII characters (32 - 127) are permitted as argument.
    /// At least one character is required.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(RequestIdError::Empty);
        }
        if let Some(idx) = value.iter().position(|b| !is_visible_ascii(*b)) {
            return Err(RequestIdError::InvisibleAscii(idx));
        }
        Ok(RequestId(String::from_utf8_lossy(value).into_owned()))
    }
}

impl TryFrom<String> for RequestId {
    type Error = RequestIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_bytes())
    }
}

const fn is_visible_ascii(b: u8) -> bool {
    32 <= b && 127 > b
}

#[derive(Debug, PartialEq, Eq)]
pub enum RequestIdError {
    Empty,
    InvisibleAscii(usize),
}

impl fmt::Display for RequestIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIdError::Empty => write!(f, "request ID is empty"),
            RequestIdError::InvisibleAscii(position_index) => {
                write!(f, "char at index {position_index} is non-visible ASCII")
            }
        }
    }
}

impl std::error::Error for RequestIdError {}

/// Looks up the correlation identifier of a request.
///
/// Called exactly once per request, before the wrapped service runs.
/// Implementations must neither block nor panic and return `None` when the
/// request carries no identifier.
pub trait RequestIdLookup {
    fn lookup(&self, request: &ServiceRequest) -> Option<RequestId>;
}

impl<F> RequestIdLookup for F
where
    F: Fn(&ServiceRequest) -> Option<RequestId>,
{
    fn lookup(&self, request: &ServiceRequest) -> Option<RequestId> {
        self(request)
    }
}

/// Reads a [`RequestId`] that an upstream middleware stored in the request
/// extensions. This is the default lookup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionRequestId;

impl RequestIdLookup for ExtensionRequestId {
    fn lookup(&self, request: &ServiceRequest) -> Option<RequestId> {
        request.request_id()
    }
}

/// Reads the request ID straight from a request header.
///
/// A missing or empty header counts as "no identifier". Values with bytes
/// outside visible ASCII are kept, with those bytes escaped (`\xc3\xb6`,
/// `\t`, ...), so the request still gets its prefix in the panic log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRequestId(HeaderName);

impl HeaderRequestId {
    pub fn new<T>(header_name: T) -> Self
    where
        T: Into<HeaderName>,
    {
        Self(header_name.into())
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.0
    }
}

impl RequestIdLookup for HeaderRequestId {
    fn lookup(&self, request: &ServiceRequest) -> Option<RequestId> {
        request
            .headers()
            .get(&self.0)
            .and_then(header_value_to_request_id)
    }
}

fn header_value_to_request_id(header_value: &HeaderValue) -> Option<RequestId> {
    let bytes = header_value.as_bytes();
    match RequestId::try_from(bytes) {
        Ok(request_id) => Some(request_id),
        Err(RequestIdError::Empty) => None,
        Err(RequestIdError::InvisibleAscii(_)) => {
            RequestId::try_from(bytes.escape_ascii().to_string()).ok()
        }
    }
}

pub trait RequestIdExtract {
    /// The request ID stored in the message extensions, if any.
    fn request_id(&self) -> Option<RequestId>;
}

impl<T> RequestIdExtract for T
where
    T: HttpMessage,
{
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().cloned()
    }
}
