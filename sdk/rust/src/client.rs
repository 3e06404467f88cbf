use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields shared by person and animal records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecordBody {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub age: u32,
    pub description: Option<String>,
    pub deleted: bool,
    pub cloned: bool,
    pub cloned_from_ref: Option<String>,
}

/// What the service answered.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: String,
}

impl Reply {
    /// Trailing token of "<Kind> with ID <id> added" style messages.
    pub fn created_id(&self) -> Option<&str> {
        let rest = self.body.split(" with ID ").nth(1)?;
        rest.split_whitespace().next()
    }

    pub fn record(&self) -> Result<RecordBody, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

pub struct ResourceClient {
    client: Client,
    base_url: String,
    header: String,
    credential: String,
}

impl ResourceClient {
    pub fn new(base_url: &str, credential: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            header: "authorization".to_string(),
            credential: credential.to_string(),
        }
    }

    /// Send the credential in `header` instead of `authorization`.
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = header.to_string();
        self
    }

    /// The same client presenting a different credential.
    pub fn with_credential(&self, credential: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            header: self.header.clone(),
            credential: credential.to_string(),
        }
    }

    pub async fn create(&self, kind: &str, body: &Value) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::POST, &format!("/{kind}/")).json(body)).await
    }

    pub async fn get(&self, kind: &str, id: &str) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::GET, &format!("/{kind}/{id}"))).await
    }

    pub async fn replace(&self, kind: &str, id: &str, body: &Value) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::PUT, &format!("/{kind}/{id}")).json(body)).await
    }

    pub async fn patch(&self, kind: &str, id: &str, body: &Value) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::PATCH, &format!("/{kind}/{id}")).json(body)).await
    }

    pub async fn delete(&self, kind: &str, id: &str) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::DELETE, &format!("/{kind}/{id}"))).await
    }

    pub async fn clone_record(&self, kind: &str, id: &str) -> Result<Reply, reqwest::Error> {
        self.send(self.request(Method::POST, &format!("/{kind}/{id}/clone"))).await
    }

    /// Raw request with the credential attached, for paths not covered above.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(self.header.as_str(), self.credential.as_str())
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Reply, reqwest::Error> {
        let resp = request.send().await?;
        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        Ok(Reply {
            status,
            request_id,
            body,
        })
    }
}
