//! Supabase REST API client using the public anon key

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{Direction, OrderBy, Record, StoreClient, StoreError};
use crate::config::StoreConfig;

/// Supabase client for the lost items board
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &StoreConfig, timeout: std::time::Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the Supabase auth headers
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authed(request).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl StoreClient for SupabaseClient {
    async fn list(&self, table: &str, order: &OrderBy) -> Result<Vec<Record>, StoreError> {
        let url = format!(
            "{}?select=*&order={}",
            self.rest_url(table),
            order_param(order)
        );

        let response = self.send(self.client.get(&url)).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record, StoreError> {
        let url = self.rest_url(table);

        let request = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&[record]);
        let response = self.send(request).await?;

        // PostgREST returns an array, get first element
        let results: Vec<Record> = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        results
            .into_iter()
            .next()
            .ok_or(StoreError::NoRowReturned)
    }

    async fn probe(&self, table: &str) -> Result<Option<u64>, StoreError> {
        let url = format!("{}?select=*", self.rest_url(table));

        let request = self.client.head(&url).header("Prefer", "count=exact");
        let response = self.send(request).await?;

        let count = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        debug!(table, ?count, "Store probe succeeded");
        Ok(count)
    }
}

fn order_param(order: &OrderBy) -> String {
    let direction = match order.direction {
        Direction::Ascending => "asc",
        Direction::Descending => "desc",
    };
    format!("{}.{}", order.field, direction)
}

/// Total from a PostgREST `Content-Range` header such as `0-24/312` or `*/0`
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        StoreError::ConnectionFailed(error.to_string())
    } else {
        StoreError::Api {
            status: error.status().map(|s| s.as_u16()).unwrap_or(0),
            message: error.to_string(),
        }
    }
}

/// PostgREST error body
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a failed PostgREST response onto a store error kind
fn classify_api_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    match parsed.code.as_deref() {
        // Schema cache miss (PGRST204) or undefined_column (42703)
        Some("PGRST204") | Some("42703") => match quoted_identifier(&message) {
            Some(column) => StoreError::UnknownField(column),
            None => StoreError::Api {
                status: status.as_u16(),
                message,
            },
        },
        Some(code) if code.starts_with("23") => StoreError::ConstraintViolation(message),
        _ if status == StatusCode::BAD_GATEWAY
            || status == StatusCode::SERVICE_UNAVAILABLE
            || status == StatusCode::GATEWAY_TIMEOUT =>
        {
            StoreError::ConnectionFailed(message)
        }
        _ => StoreError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// First identifier wrapped in single or double quotes
fn quoted_identifier(message: &str) -> Option<String> {
    let start = message.find(|c: char| c == '\'' || c == '"')?;
    let quote = message[start..].chars().next()?;
    let rest = &message[start + 1..];
    let end = rest.find(quote)?;
    let name = &rest[..end];
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_cache_miss_names_the_column() {
        let body = r#"{"code":"PGRST204","details":null,"hint":null,"message":"Could not find the 'student_id' column of 'lost_items' in the schema cache"}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(err.is_unknown_field("student_id"));
    }

    #[test]
    fn undefined_column_names_the_column() {
        let body = r#"{"code":"42703","message":"column \"student_id\" of relation \"lost_items\" does not exist"}"#;
        let err = classify_api_error(StatusCode::BAD_REQUEST, body);
        assert!(err.is_unknown_field("student_id"));
        assert!(!err.is_unknown_field("lost_items"));
    }

    #[test]
    fn constraint_codes_are_violations() {
        let body = r#"{"code":"23502","message":"null value in column \"name\" violates not-null constraint"}"#;
        assert!(matches!(
            classify_api_error(StatusCode::BAD_REQUEST, body),
            StoreError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn unstructured_body_is_kept_verbatim() {
        match classify_api_error(StatusCode::UNAUTHORIZED, "Invalid API key") {
            StoreError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gateway_failures_are_connection_errors() {
        assert!(matches!(
            classify_api_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            StoreError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/312"), Some(312));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }

    #[test]
    fn order_param_format() {
        assert_eq!(order_param(&OrderBy::desc("created_at")), "created_at.desc");
        assert_eq!(order_param(&OrderBy::asc("name")), "name.asc");
    }
}
