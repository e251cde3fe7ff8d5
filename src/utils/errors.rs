#![forbid(unsafe_code)]

use poem_openapi::Object;
use thiserror::Error;

// ***************************************************************************
//                             Client Messages
// ***************************************************************************
// The generic messages returned to http clients.
pub const MALFORMED_REQUEST_MSG : &str = "Request must be JSON";
pub const INVALID_TOPIC_MSG     : &str = "Invalid topic format";

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("meme_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    #[error("Invalid configuration: {}", .0)]
    InvalidConfig(String),

    #[error("Invalid category catalog: {}", .0)]
    InvalidCatalog(String),

    /// The request body could not be read as a json object.
    #[error("{}: {}", MALFORMED_REQUEST_MSG, .0)]
    MalformedRequest(String),

    /// The topic is missing, not a string, blank or too long.
    #[error("{}: {}", INVALID_TOPIC_MSG, .0)]
    InvalidTopic(String),

    /// A category name that the resolver should never have produced.
    #[error("INTERNAL ERROR: unknown category '{}'", .0)]
    InternalInconsistency(String),
}

impl Errors {
    /** The message an http client sees for this error.  Only the request
     * errors have client facing text, everything else is reported generically.
     */
    pub fn client_msg(&self) -> &'static str {
        match self {
            Errors::MalformedRequest(_) => MALFORMED_REQUEST_MSG,
            Errors::InvalidTopic(_) => INVALID_TOPIC_MSG,
            _ => "Internal server error",
        }
    }
}

// ***************************************************************************
//                              HttpError
// ***************************************************************************
// The json body of every non-2xx response.
#[derive(Object, Debug)]
pub struct HttpError {
    pub error: String,
}

impl HttpError {
    pub fn new(error: &str) -> Self {
        Self {error: error.to_string()}
    }
}

impl From<&Errors> for HttpError {
    fn from(e: &Errors) -> Self {
        HttpError::new(e.client_msg())
    }
}
