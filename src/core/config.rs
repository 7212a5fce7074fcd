use crate::{ExtensionRequestId, LogPanicLogger, PanicLogger, RequestIdLookup};

pub(crate) struct Config {
    pub(crate) logger: Box<dyn PanicLogger>,
    pub(crate) request_id_lookup: Box<dyn RequestIdLookup>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger: Box::new(LogPanicLogger),
            request_id_lookup: Box::new(ExtensionRequestId),
        }
    }
}
