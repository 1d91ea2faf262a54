use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rcb_core::Error;

/// Core error carried to the HTTP layer.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidCallback(_) => StatusCode::BAD_REQUEST,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::TokenExchange(_) | Error::ListFetch(_) | Error::PageLimit { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            return (status, "Internal error").into_response();
        }
        tracing::warn!(status = %status, error = %self.0, "request rejected");
        (status, self.0.to_string()).into_response()
    }
}
