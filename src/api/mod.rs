//! REST API client.
//!
//! Every backend response is wrapped in a `{ success, data | message }`
//! envelope. The envelope is turned into a `Result` right here, so nothing
//! downstream ever looks at the raw `success` flag.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthContext;
use crate::config::Config;
use crate::errors::{ErrorDetails, ErrorEnvelope, SyncError, SyncResult};
use crate::form::Payload;
use crate::models::Resource;
use crate::query::QueryState;

/// Success/failure envelope returned by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorDetails>,
}

impl<T> Envelope<T> {
    /// Check `success` and hand back the payload.
    pub fn into_result(self, status: StatusCode) -> SyncResult<Reply<T>> {
        if self.success {
            Ok(Reply {
                data: self.data,
                message: self.message,
            })
        } else {
            let message = self
                .message
                .or_else(|| self.error.and_then(|details| details.message));
            Err(SyncError::Server {
                status: Some(status.as_u16()),
                message,
            })
        }
    }
}

/// Payload of a successful envelope.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Reply<T> {
    pub fn require_data(self) -> SyncResult<T> {
        self.data.ok_or(SyncError::Server {
            status: None,
            message: None,
        })
    }
}

/// One page of a collection, with the server-reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
}

impl<T: Resource> Page<T> {
    /// Pull `data.<items key>` and `data.pagination.totalItems` out of a list reply.
    ///
    /// A bare array means the endpoint does not paginate, so the array is the
    /// whole collection.
    pub fn from_data(data: Value) -> SyncResult<Self> {
        match data {
            Value::Array(_) => {
                let items: Vec<T> = serde_json::from_value(data)?;
                let total_items = items.len() as u64;
                Ok(Self { items, total_items })
            }
            Value::Object(mut object) => {
                let Some(items) = object.remove(T::ITEMS_KEY) else {
                    tracing::error!(
                        "List response for {} has no '{}' key",
                        T::COLLECTION,
                        T::ITEMS_KEY
                    );
                    return Err(SyncError::Server {
                        status: None,
                        message: None,
                    });
                };
                let items: Vec<T> = serde_json::from_value(items)?;
                let total_items = object
                    .get("pagination")
                    .and_then(|p| p.get("totalItems"))
                    .and_then(Value::as_u64)
                    .unwrap_or_else(|| {
                        tracing::debug!("List response for {} has no pagination", T::COLLECTION);
                        items.len() as u64
                    });
                Ok(Self { items, total_items })
            }
            _ => Err(SyncError::Server {
                status: None,
                message: None,
            }),
        }
    }
}

/// A fetched binary attachment.
#[derive(Debug, Clone)]
pub struct Binary {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Client for the admin REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: AuthContext,
}

impl ApiClient {
    /// Build a client with the configured transport timeout.
    pub fn new(config: &Config, auth: AuthContext) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.api_url, auth))
    }

    pub fn with_client(client: Client, base_url: &str, auth: AuthContext) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Absolute URL for a stored file, for direct download.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET /api/<resource>?<filters>&page=&limit=&sort=
    pub async fn list<T: Resource>(&self, query: &QueryState) -> SyncResult<Page<T>> {
        let params = query.to_params();
        tracing::debug!("GET {} {:?}", T::COLLECTION, params);
        let request = self.client.get(self.url(T::COLLECTION)).query(&params);
        let reply = self.execute::<Value>(request).await?;
        Page::from_data(reply.require_data()?)
    }

    /// GET /api/<resource>/<id>
    pub async fn get<T: Resource>(&self, id: &str) -> SyncResult<T> {
        let request = self.client.get(self.url(&format!("{}/{}", T::COLLECTION, id)));
        self.execute::<T>(request).await?.require_data()
    }

    /// POST /api/<resource>
    pub async fn create<T: Resource>(&self, payload: Payload) -> SyncResult<T> {
        tracing::debug!("POST {} (multipart: {})", T::COLLECTION, payload.is_multipart());
        let request = with_payload(self.client.post(self.url(T::COLLECTION)), payload)?;
        self.execute::<T>(request).await?.require_data()
    }

    /// PUT /api/<resource>/<id>
    pub async fn update<T: Resource>(&self, id: &str, payload: Payload) -> SyncResult<T> {
        tracing::debug!("PUT {}/{}", T::COLLECTION, id);
        let request = self
            .client
            .put(self.url(&format!("{}/{}", T::COLLECTION, id)));
        let request = with_payload(request, payload)?;
        self.execute::<T>(request).await?.require_data()
    }

    /// PATCH /api/<resource>/<id>/<action>
    ///
    /// Single-field transitions may answer with the record or only a message.
    pub async fn patch<T: Resource>(
        &self,
        id: &str,
        action: &str,
        body: Option<Value>,
    ) -> SyncResult<Reply<T>> {
        tracing::debug!("PATCH {}/{}/{}", T::COLLECTION, id, action);
        let mut request = self
            .client
            .patch(self.url(&format!("{}/{}/{}", T::COLLECTION, id, action)));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.execute::<T>(request).await
    }

    /// DELETE /api/<resource>/<id>
    pub async fn delete<T: Resource>(&self, id: &str) -> SyncResult<()> {
        tracing::debug!("DELETE {}/{}", T::COLLECTION, id);
        let request = self
            .client
            .delete(self.url(&format!("{}/{}", T::COLLECTION, id)));
        self.execute::<Value>(request).await.map(|_| ())
    }

    /// GET /api/<collection>/stats, server-computed only.
    pub async fn stats<S: DeserializeOwned>(&self, collection: &str) -> SyncResult<S> {
        let request = self.client.get(self.url(&format!("{}/stats", collection)));
        self.execute::<S>(request).await?.require_data()
    }

    /// Fetch a binary file under an explicit deadline.
    pub async fn fetch_binary(&self, path: &str, timeout: Duration) -> SyncResult<Binary> {
        let url = self.resolve(path);
        let fetch = async {
            let response = self
                .auth
                .apply(self.client.get(&url))
                .send()
                .await
                .map_err(|e| binary_error(&url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::from_status(status, None));
            }
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = response.bytes().await.map_err(|e| binary_error(&url, e))?;
            Ok::<_, SyncError>(Binary {
                bytes,
                content_type,
            })
        };

        match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Fetching {} exceeded {:?}", url, timeout);
                Err(SyncError::Timeout(format!("{} took longer than {:?}", url, timeout)))
            }
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<Reply<T>> {
        let response = self.auth.apply(request).send().await?;
        decode(response).await
    }
}

/// A transport timeout while fetching a file is a `Timeout`, not a generic failure.
fn binary_error(url: &str, err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        tracing::warn!("Fetching {} timed out in transport: {}", url, err);
        SyncError::Timeout(format!("{} timed out", url))
    } else {
        err.into()
    }
}

fn with_payload(request: RequestBuilder, payload: Payload) -> SyncResult<RequestBuilder> {
    Ok(match payload {
        Payload::Json(body) => request.json(&body),
        Payload::Multipart { fields, files } => request.multipart(Payload::into_form(fields, files)?),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> SyncResult<Reply<T>> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&body)
            .ok()
            .and_then(ErrorEnvelope::into_message);
        return Err(SyncError::from_status(status, message));
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body)?;
    envelope.into_result(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobPosting;
    use serde_json::json;

    #[test]
    fn test_envelope_failure_carries_message() {
        let envelope: Envelope<Value> =
            serde_json::from_value(json!({ "success": false, "message": "Nope" })).unwrap();
        let err = envelope.into_result(StatusCode::OK).unwrap_err();
        assert_eq!(err.user_message(), "Nope");
    }

    #[test]
    fn test_page_from_paginated_data() {
        let data = json!({
            "jobs": [
                { "_id": "j1", "title": "Engineer", "department": "R&D", "location": "Remote" },
                { "_id": "j2", "title": "Analyst", "department": "Ops", "location": "Lagos" }
            ],
            "pagination": { "totalItems": 47, "currentPage": 1 }
        });
        let page = Page::<JobPosting>::from_data(data).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 47);
        assert_eq!(page.items[0].id, "j1");
    }

    #[test]
    fn test_page_from_bare_array() {
        let data = json!([{ "id": "j1", "title": "Engineer" }]);
        let page = Page::<JobPosting>::from_data(data).unwrap();
        assert_eq!(page.total_items, 1);
    }

    #[test]
    fn test_page_without_items_key_is_rejected() {
        let data = json!({
            "items": [{ "_id": "j1", "title": "Engineer" }],
            "pagination": { "totalItems": 1 }
        });
        let err = Page::<JobPosting>::from_data(data).unwrap_err();
        assert_eq!(
            err,
            SyncError::Server {
                status: None,
                message: None
            }
        );
    }

    #[test]
    fn test_resolve() {
        let api = ApiClient::with_client(
            Client::new(),
            "http://localhost:5000/",
            AuthContext::anonymous(),
        );
        assert_eq!(api.url("jobs"), "http://localhost:5000/api/jobs");
        assert_eq!(
            api.resolve("/uploads/cv.pdf"),
            "http://localhost:5000/uploads/cv.pdf"
        );
        assert_eq!(api.resolve("https://cdn.example/x.png"), "https://cdn.example/x.png");
    }
}
