use std::collections::HashMap;

use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::server::response::ApiError;

pub const INVALID_BODY: &str = "Request body invalid.";

/// Body of `POST /groups/{group_id}/libraries/`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateGroupLibraryRequest {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// `r` or `rw`; defaults to `rw`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_template: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Untyped request fields, read from a JSON object or a urlencoded form.
///
/// Fields are type-checked one at a time, so each handler check reports its
/// own error in the order the handler runs them.
#[derive(Debug, Default)]
pub struct RequestFields(Map<String, Value>);

impl RequestFields {
    pub async fn read(request: Request) -> Result<Self, ApiError> {
        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(form) = Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map_err(|_| ApiError::bad_request(INVALID_BODY))?;
            return Ok(Self(
                form.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
            ));
        }

        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(|_| ApiError::bad_request(INVALID_BODY))?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ApiError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice(bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            _ => Err(ApiError::bad_request(INVALID_BODY)),
        }
    }

    /// A string field; missing and `null` are `None`, any other type is
    /// rejected as `"<key> invalid."`.
    pub fn text(&self, key: &str) -> Result<Option<&str>, ApiError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ApiError::bad_request(format!("{key} invalid."))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_text_fields() {
        let fields =
            RequestFields::from_json(br#"{"repo_name": "Notes", "password": null, "permission": 1}"#)
                .unwrap();

        assert_eq!(fields.text("repo_name").unwrap(), Some("Notes"));
        assert_eq!(fields.text("password").unwrap(), None);
        assert_eq!(fields.text("library_template").unwrap(), None);
        assert_eq!(fields.text("permission").unwrap_err().message, "permission invalid.");
    }

    #[test]
    fn test_body_must_be_an_object() {
        assert!(RequestFields::from_json(b"").unwrap().text("repo_name").unwrap().is_none());
        assert_eq!(RequestFields::from_json(b"[1]").unwrap_err().message, INVALID_BODY);
        assert_eq!(RequestFields::from_json(b"{oops").unwrap_err().message, INVALID_BODY);
    }

    #[tokio::test]
    async fn test_form_body() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("repo_name=My+Notes&permission=r"))
            .unwrap();

        let fields = RequestFields::read(request).await.unwrap();
        assert_eq!(fields.text("repo_name").unwrap(), Some("My Notes"));
        assert_eq!(fields.text("permission").unwrap(), Some("r"));
    }
}
