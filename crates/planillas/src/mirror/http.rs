use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{MirrorDocument, MirrorError, RemoteMirror};

/// Client for a JSON document store exposing
/// `POST /{collection}`, `PATCH /{collection}/{id}` and `DELETE /{collection}/{id}`.
pub struct HttpMirror {
    client: Client,
    base_url: String,
    collection: String,
    token: Option<String>,
}

impl HttpMirror {
    pub fn new(
        base_url: &str,
        collection: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MirrorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.trim_matches('/').to_string(),
            token,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    fn document_url(&self, remote_id: &str) -> String {
        format!("{}/{}", self.collection_url(), remote_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn transport(err: reqwest::Error) -> MirrorError {
    if err.is_timeout() {
        MirrorError::Transport(format!("timed out: {}", err))
    } else {
        MirrorError::Transport(err.to_string())
    }
}

async fn rejected(response: reqwest::Response) -> MirrorError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    MirrorError::Rejected { status, body }
}

/// Accepts `{"id": "..."}` or a resource name like `{"name": "docs/planillas/abc"}`.
fn extract_remote_id(body: &Value) -> Option<String> {
    if let Some(id) = body.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    body.get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    async fn create(&self, doc: &MirrorDocument) -> Result<String, MirrorError> {
        let url = self.collection_url();
        debug!(%url, id = %doc.id, "mirror create");
        let response = self
            .authorized(self.client.post(&url).json(doc))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| MirrorError::Malformed(e.to_string()))?;
        extract_remote_id(&body)
            .ok_or_else(|| MirrorError::Malformed(format!("no document id in {}", body)))
    }

    async fn update(&self, remote_id: &str, doc: &MirrorDocument) -> Result<(), MirrorError> {
        let url = self.document_url(remote_id);
        debug!(%url, id = %doc.id, "mirror update");
        let response = self
            .authorized(self.client.patch(&url).json(doc))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn delete(&self, remote_id: &str) -> Result<(), MirrorError> {
        let url = self.document_url(remote_id);
        debug!(%url, "mirror delete");
        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(transport)?;
        // Already gone is as good as deleted.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(rejected(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_plain_id() {
        assert_eq!(
            extract_remote_id(&json!({"id": "abc"})),
            Some("abc".to_string())
        );
    }

    #[test]
    fn extracts_id_from_resource_name() {
        let body = json!({"name": "projects/p/databases/d/documents/planillas/xyz"});
        assert_eq!(extract_remote_id(&body), Some("xyz".to_string()));
    }

    #[test]
    fn missing_id_is_none() {
        assert_eq!(extract_remote_id(&json!({"ok": true})), None);
        assert_eq!(extract_remote_id(&json!({"name": "planillas/"})), None);
    }

    #[test]
    fn urls_are_normalized() {
        let mirror = HttpMirror::new(
            "http://mirror.local/v1/",
            "/planillas/",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(mirror.collection_url(), "http://mirror.local/v1/planillas");
        assert_eq!(
            mirror.document_url("abc"),
            "http://mirror.local/v1/planillas/abc"
        );
    }
}
