use anyhow::{bail, Result};
use serde_json::Value;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn handle(res: reqwest::Response) -> Result<Value> {
        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            Ok(body)
        } else {
            let detail = body
                .get("detail")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            bail!(detail)
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let res = self.http.get(format!("{}{}", self.base_url, path)).send().await?;
        Self::handle(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::handle(res).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Value> {
        let res = self.http.post(format!("{}{}", self.base_url, path)).send().await?;
        Self::handle(res).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        let res = self
            .http
            .put(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::handle(res).await
    }
}
