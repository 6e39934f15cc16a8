use eventsource_stream::EventStreamError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorType {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimit,
    Offline,
}

impl ErrorType {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorType::BadRequest => 400,
            ErrorType::Unauthorized => 401,
            ErrorType::Forbidden => 403,
            ErrorType::NotFound => 404,
            ErrorType::RateLimit => 429,
            ErrorType::Offline => 503,
        }
    }
}

/// The part of the product an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Surface {
    Chat,
    Auth,
    Api,
    Stream,
    Database,
    History,
    Document,
}

/// Typed application error, addressed by a `<type>:<surface>` code.
///
/// Its message is safe to show to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct ChatSdkError {
    pub error_type: ErrorType,
    pub surface: Surface,
    pub cause: Option<String>,
}

impl ChatSdkError {
    pub fn new(error_type: ErrorType, surface: Surface) -> Self {
        Self {
            error_type,
            surface,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn code(&self) -> String {
        format!("{}:{}", self.error_type, self.surface)
    }

    pub fn status_code(&self) -> u16 {
        self.error_type.status_code()
    }

    pub fn message(&self) -> &'static str {
        if self.surface == Surface::Database {
            return "An error occurred while executing a database query.";
        }

        match (self.error_type, self.surface) {
            (ErrorType::BadRequest, Surface::Api) => {
                "The request couldn't be processed. Please check your input and try again."
            }
            (ErrorType::Unauthorized, Surface::Auth) => "You need to sign in before continuing.",
            (ErrorType::Forbidden, Surface::Auth) => {
                "Your account does not have access to this feature."
            }
            (ErrorType::RateLimit, Surface::Chat) => {
                "You have exceeded your maximum number of messages for the day! Please try again later."
            }
            (ErrorType::NotFound, Surface::Chat) => {
                "The requested chat was not found. Please check the chat ID and try again."
            }
            (ErrorType::Forbidden, Surface::Chat) => {
                "This chat belongs to another user. Please check the chat ID and try again."
            }
            (ErrorType::Unauthorized, Surface::Chat) => {
                "You need to sign in to view this chat. Please sign in and try again."
            }
            (ErrorType::Offline, Surface::Chat) => {
                "We're having trouble sending your message. Please check your internet connection and try again."
            }
            (ErrorType::NotFound, Surface::Document) => {
                "The requested document was not found. Please check the document ID and try again."
            }
            (ErrorType::Forbidden, Surface::Document) => {
                "This document belongs to another user. Please check the document ID and try again."
            }
            (ErrorType::Unauthorized, Surface::Document) => {
                "You need to sign in to view this document. Please sign in and try again."
            }
            (ErrorType::BadRequest, Surface::Document) => {
                "The request to create or update the document was invalid. Please check your input and try again."
            }
            _ => "Something went wrong. Please try again later.",
        }
    }
}

impl FromStr for ChatSdkError {
    type Err = ApiError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let invalid = || ApiError::ResponseParsing {
            details: format!("Unrecognized error code '{code}'"),
        };
        let (error_type, surface) = code.split_once(':').ok_or_else(invalid)?;
        Ok(Self::new(
            error_type.parse().map_err(|_| invalid())?,
            surface.parse().map_err(|_| invalid())?,
        ))
    }
}

/// JSON body the service returns alongside a non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl From<&ChatSdkError> for ErrorBody {
    fn from(err: &ChatSdkError) -> Self {
        Self {
            code: err.code(),
            cause: err.cause.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SseParseError {
    #[error("UTF-8 error: {details}")]
    Utf8 { details: String },
    #[error("Parse error: {details}")]
    Parser { details: String },
    #[error("Transport error: {details}")]
    Transport { details: String },
}

impl<E> From<EventStreamError<E>> for SseParseError
where
    E: std::error::Error,
{
    fn from(err: EventStreamError<E>) -> Self {
        match err {
            EventStreamError::Utf8(err) => Self::Utf8 {
                details: err.to_string(),
            },
            EventStreamError::Parser(err) => Self::Parser {
                details: err.to_string(),
            },
            EventStreamError::Transport(err) => Self::Transport {
                details: err.to_string(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    ChatSdk(#[from] ChatSdkError),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Failed to parse response: {details}")]
    ResponseParsing { details: String },

    #[error("SSE parse error: {0}")]
    SseParse(#[from] SseParseError),

    #[error("Stream error: {details}")]
    Stream { details: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn offline(surface: Surface) -> Self {
        ApiError::ChatSdk(ChatSdkError::new(ErrorType::Offline, surface))
    }

    pub fn as_chat_sdk(&self) -> Option<&ChatSdkError> {
        match self {
            ApiError::ChatSdk(err) => Some(err),
            _ => None,
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Api(api_err) => api_err,
            other => ApiError::Configuration(other.to_string()),
        }
    }
}

/// Text to show the user for a failed request.
///
/// Typed application errors are shown verbatim; anything else is logged and replaced
/// with a generic message.
pub fn user_facing_message(error: &ApiError) -> String {
    match error {
        ApiError::ChatSdk(err) => err.message().to_string(),
        other => {
            tracing::error!(target: "api::error", error = %other, "Unexpected request failure");
            GENERIC_ERROR_MESSAGE.to_string()
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({cause})", self.code),
            None => f.write_str(&self.code),
        }
    }
}
