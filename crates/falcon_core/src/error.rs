use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum FalconError {
    #[error("Invalid configuration for '{field}'")]
    #[diagnostic(
        code(falcon_core::invalid_configuration),
        help("{reason}")
    )]
    Configuration { field: String, reason: String },

    #[error("Falcon authentication failed")]
    #[diagnostic(
        code(falcon_core::authentication_failed),
        help(
            "Check the API client ID and secret, and that the base URL points at the correct Falcon cloud"
        )
    )]
    AuthenticationFailed {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Provider not initialized")]
    #[diagnostic(
        code(falcon_core::not_initialized),
        help("Call initialize() before issuing API requests")
    )]
    NotInitialized,

    #[error("Tool '{tool_name}' is already registered")]
    #[diagnostic(
        code(falcon_core::duplicate_tool),
        help("Tool names must be unique across all registered modules")
    )]
    DuplicateTool { tool_name: String },

    #[error("HTTP request to Falcon API failed")]
    #[diagnostic(
        code(falcon_core::http_request_failed),
        help("Check network connectivity and the Falcon base URL")
    )]
    Http {
        #[source]
        cause: reqwest::Error,
    },

    #[error("Unexpected response from Falcon API")]
    #[diagnostic(
        code(falcon_core::unexpected_response),
        help("The API returned status {status_code}: {message}")
    )]
    UnexpectedResponse { status_code: u16, message: String },
}

impl FalconError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn auth_failed(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            status_code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FalconError {
    fn from(cause: reqwest::Error) -> Self {
        Self::Http { cause }
    }
}

pub type Result<T> = std::result::Result<T, FalconError>;
