use super::error::code::ErrorCode;
use super::error::RustRelayError;
use poem::error::ResponseError;
use poem::Body;
use poem::{http::StatusCode, Error, Response};
use tracing::error;

pub mod error;
pub mod log;
pub mod paginated;
pub mod rustls;
pub mod timeout;

#[inline]
fn create_rust_relay_error(message: &str, code: ErrorCode) -> RustRelayError {
    RustRelayError::Generic {
        message: message.into(),
        location: snafu::Location::default(),
        code,
    }
}

#[inline]
pub fn create_api_error_response(message: &str, code: ErrorCode) -> Error {
    let rust_relay_error = create_rust_relay_error(message, code);
    rust_relay_error.into()
}

impl ResponseError for RustRelayError {
    fn status(&self) -> StatusCode {
        match self {
            RustRelayError::Generic {
                message: _,
                location: _,
                code,
            } => code.status(),
        }
    }

    fn as_response(&self) -> Response
    where
        Self: std::error::Error + Send + Sync + 'static,
    {
        match self {
            RustRelayError::Generic {
                message,
                location,
                code,
            } => {
                error!(
                    error_code = *code as u32,
                    error_message = %message,
                    error_location = ?location
                );

                let body = Body::from_json(serde_json::json!({
                    "code": *code as u32,
                    "message": message.to_string(),
                }))
                .unwrap();

                Response::builder().status(self.status()).body(body)
            }
        }
    }
}
