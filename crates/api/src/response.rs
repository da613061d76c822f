//! Redirect-with-message responses.
//!
//! Every mutating endpoint answers with a [`Flash`]: `303 See Other` to the
//! page the browser should load next, the message in a `flash` cookie, and
//! the same data as JSON for API clients.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use cinelog_common::{AppError, AppResult, FieldErrors};
use cinelog_core::Export;
use serde::Serialize;

/// Where failed authentication sends the browser.
pub const SIGN_IN_PATH: &str = "/users/sign_in";

/// Flash severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Notice,
    Alert,
}

/// A redirect carrying a one-shot message.
#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub redirect: String,
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn notice(redirect: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            redirect: redirect.into(),
            level: Level::Notice,
            message: message.into(),
        }
    }

    pub fn alert(redirect: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            redirect: redirect.into(),
            level: Level::Alert,
            message: message.into(),
        }
    }

    /// Notice on `Ok`, alert on `Err`.
    pub fn from_result(redirect: impl Into<String>, result: Result<String, String>) -> Self {
        match result {
            Ok(message) => Self::notice(redirect, message),
            Err(message) => Self::alert(redirect, message),
        }
    }
}

impl IntoResponse for Flash {
    fn into_response(self) -> Response {
        let payload = serde_json::json!({ "level": self.level, "message": self.message });
        let cookie = Cookie::build(("flash", urlencoding::encode(&payload.to_string()).into_owned()))
            .path("/")
            .http_only(true)
            .build();

        let mut response = (StatusCode::SEE_OTHER, Json(&self)).into_response();
        let headers = response.headers_mut();
        if let Ok(location) = HeaderValue::from_str(&self.redirect) {
            headers.insert(header::LOCATION, location);
        }
        if let Ok(cookie) = HeaderValue::from_str(&cookie.to_string()) {
            headers.insert(header::SET_COOKIE, cookie);
        }
        response
    }
}

/// Field-level validation failures for a form, rendered in place.
#[derive(Debug, Clone, Serialize)]
pub struct FormErrors {
    pub form: &'static str,
    pub errors: FieldErrors,
}

impl IntoResponse for FormErrors {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

/// A failed request, rendered as [`FormErrors`] or an alert [`Flash`].
#[derive(Debug)]
pub struct Rejection {
    error: AppError,
    redirect: String,
    action: &'static str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self.error {
            AppError::Invalid(errors) => FormErrors {
                form: self.action,
                errors,
            }
            .into_response(),
            AppError::Unauthorized(message) => Flash::alert(SIGN_IN_PATH, message).into_response(),
            error if error.is_server_error() => {
                tracing::error!(error = %error, action = self.action, "Request failed");
                Flash::alert(
                    self.redirect,
                    format!(
                        "Failed to {}. An error occurred while processing your request.",
                        self.action
                    ),
                )
                .into_response()
            }
            error => {
                tracing::debug!(error = %error, action = self.action, "Request rejected");
                let message = error.user_message().unwrap_or_default();
                Flash::alert(self.redirect, message).into_response()
            }
        }
    }
}

/// Attach the redirect target and action name used when a call fails.
pub trait OrRedirect<T> {
    fn or_redirect(self, redirect: impl Into<String>, action: &'static str)
    -> Result<T, Rejection>;
}

impl<T> OrRedirect<T> for AppResult<T> {
    fn or_redirect(
        self,
        redirect: impl Into<String>,
        action: &'static str,
    ) -> Result<T, Rejection> {
        self.map_err(|error| Rejection {
            error,
            redirect: redirect.into(),
            action,
        })
    }
}

/// Handler result: a page or a rejection.
pub type Handled<T = Response> = Result<T, Rejection>;

/// Serve an export as a download.
pub fn download(export: Export) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    (
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response()
}
