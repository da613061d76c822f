//! Request extractors.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Multipart},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use cinelog_common::{AppError, AppResult};
use cinelog_core::{ImageUpload, Upload};
use cinelog_db::entities::user;

use crate::response::{Flash, SIGN_IN_PATH};

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                Flash::alert(
                    SIGN_IN_PATH,
                    "You need to sign in or sign up before continuing.",
                )
                .into_response()
            })
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    #[must_use]
    pub fn into_image(self) -> ImageUpload {
        ImageUpload {
            filename: self.filename,
            content_type: self.content_type,
            bytes: self.bytes,
        }
    }

    #[must_use]
    pub fn into_upload(self) -> Upload {
        Upload {
            filename: self.filename,
            bytes: self.bytes,
        }
    }
}

/// A fully read multipart form.
///
/// Repeated text fields (`genre_ids[]`) keep every value. Empty file inputs
/// are dropped.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, FilePart>,
}

impl FormData {
    /// Drain a multipart body.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();

            if let Some(filename) = field.file_name().map(ToString::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                if !filename.is_empty() && !bytes.is_empty() {
                    form.files.insert(
                        name,
                        FilePart {
                            filename,
                            content_type,
                            bytes,
                        },
                    );
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.entry(name).or_default().push(text);
            }
        }
        Ok(form)
    }

    /// First value of a text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|v| v.first()).cloned()
    }

    /// First value, or empty.
    #[must_use]
    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    /// Every non-empty value of a repeated field.
    #[must_use]
    pub fn all(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
            .unwrap_or_default()
    }

    /// A checkbox-style boolean.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|v| matches!(v.as_str(), "1" | "true" | "on"))
    }

    pub fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }
}
