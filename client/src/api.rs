//! HTTP client for the mask persistence API.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use wallmask_shared::{
    ErrorBody, Mask, MaskId, MaskPatch, ModelId, NewMask, UpdatedMask, ValidationErrors,
};

pub const DEFAULT_API_BASE: &str = "http://localhost:3001";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("rejected by the server:\n{}", .0.summary())]
    Validation(ValidationErrors),
    #[error("mask not found")]
    NotFound,
    #[error("server error (HTTP {0})")]
    Server(u16),
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The persistence operations the session controller needs.
#[async_trait(?Send)]
pub trait MaskFacade {
    async fn list(&self, model_id: ModelId) -> Result<Vec<Mask>, ApiError>;
    async fn create(&self, mask: &NewMask) -> Result<Mask, ApiError>;
    async fn update(&self, id: MaskId, patch: &MaskPatch) -> Result<UpdatedMask, ApiError>;
    async fn delete(&self, id: MaskId) -> Result<(), ApiError>;
}

/// Picks the API root: page attribute, then build-time env, then the local default.
pub fn resolve_api_base(attribute: Option<String>) -> String {
    let base = attribute
        .filter(|value| !value.trim().is_empty())
        .or_else(|| option_env!("WALLMASK_API_BASE_URL").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    base.trim().trim_end_matches('/').to_string()
}

pub fn masks_url(base: &str, model_id: ModelId) -> String {
    format!("{base}/masks?modelId={model_id}")
}

pub fn mask_url(base: &str, id: MaskId) -> String {
    format!("{base}/masks/{id}")
}

/// Maps a non-2xx response onto the error the UI reports.
pub fn classify_failure(status: u16, body: &str) -> ApiError {
    match status {
        400 => match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody::Validation { error }) => ApiError::Validation(error),
            Ok(ErrorBody::Message { error }) => {
                let mut errors = ValidationErrors::default();
                errors.form(error);
                ApiError::Validation(errors)
            }
            Err(_) => ApiError::Server(status),
        },
        404 => ApiError::NotFound,
        _ => ApiError::Server(status),
    }
}

fn transport(error: gloo_net::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !response.ok() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(classify_failure(status, &body));
    }
    response
        .json::<T>()
        .await
        .map_err(|error| ApiError::Decode(error.to_string()))
}

pub struct HttpFacade {
    base: String,
}

impl HttpFacade {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait(?Send)]
impl MaskFacade for HttpFacade {
    async fn list(&self, model_id: ModelId) -> Result<Vec<Mask>, ApiError> {
        let response = Request::get(&masks_url(&self.base, model_id))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn create(&self, mask: &NewMask) -> Result<Mask, ApiError> {
        let response = Request::post(&format!("{}/masks", self.base))
            .json(mask)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn update(&self, id: MaskId, patch: &MaskPatch) -> Result<UpdatedMask, ApiError> {
        let response = Request::put(&mask_url(&self.base, id))
            .json(patch)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn delete(&self, id: MaskId) -> Result<(), ApiError> {
        let response = Request::delete(&mask_url(&self.base, id))
            .send()
            .await
            .map_err(transport)?;
        if !response.ok() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_a_trimmed_base() {
        let base = resolve_api_base(Some("https://wall.example/api/ ".into()));
        assert_eq!(base, "https://wall.example/api");
        assert_eq!(masks_url(&base, 1), "https://wall.example/api/masks?modelId=1");
        assert_eq!(mask_url(&base, 12), "https://wall.example/api/masks/12");
    }

    #[test]
    fn blank_attribute_falls_back() {
        let base = resolve_api_base(Some("  ".into()));
        let expected = option_env!("WALLMASK_API_BASE_URL").unwrap_or(DEFAULT_API_BASE);
        assert_eq!(base, expected.trim().trim_end_matches('/'));
    }

    #[test]
    fn structured_validation_errors_survive() {
        let body = r#"{"error":{"formErrors":[],"fieldErrors":{"name":["Required"]}}}"#;
        let ApiError::Validation(errors) = classify_failure(400, body) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.field_errors["name"], ["Required"]);
    }

    #[test]
    fn plain_bad_requests_become_form_errors() {
        let ApiError::Validation(errors) = classify_failure(400, r#"{"error":"Invalid id"}"#)
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.form_errors, ["Invalid id"]);
    }

    #[test]
    fn other_statuses() {
        assert_eq!(classify_failure(404, ""), ApiError::NotFound);
        assert_eq!(classify_failure(500, "oops"), ApiError::Server(500));
        assert_eq!(classify_failure(429, "{}"), ApiError::Server(429));
        assert_eq!(classify_failure(400, "<html>"), ApiError::Server(400));
    }
}
