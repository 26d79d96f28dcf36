//! PostgREST client for the hosted backend.

use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use super::{Backend, Query, Table};
use crate::config::ClientConfig;
use crate::util::parse_api_error;
use crate::{Error, Result};

/// Table access over the backend's REST endpoint (`/rest/v1`).
///
/// Requests carry the anon key and, once signed in, the user's access token
/// so row-level security sees the caller.
#[derive(Clone)]
pub struct RestBackend {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl RestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            rest_url: format!("{}/rest/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Same client, authenticated as a signed-in user.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.rest_url, table.as_str())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = parse_api_error(status, &body);
        tracing::debug!("{table} request failed: {message}");
        Err(Error::Backend(format!("{table}: {message}")))
    }

    async fn representation(response: Response) -> Result<Vec<Value>> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(Error::Backend(format!(
                "unexpected response payload: {other}"
            ))),
        }
    }
}

impl Backend for RestBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let request = self.client.get(self.table_url(table)).query(&query.to_params());
        let response = self.send(table, request).await?;
        Self::representation(response).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(table, request).await?;
        Self::representation(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Backend(format!("{table}: insert returned no row")))
    }

    async fn update(&self, table: Table, filter: &Query, patch: Value) -> Result<usize> {
        if !filter.has_filters() {
            return Err(Error::InvalidInput(format!(
                "refusing to update every row of {table}"
            )));
        }
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&filter.to_filter_params())
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(table, request).await?;
        Ok(Self::representation(response).await?.len())
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.send(table, request).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Query) -> Result<usize> {
        if !filter.has_filters() {
            return Err(Error::InvalidInput(format!(
                "refusing to delete every row of {table}"
            )));
        }
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&filter.to_filter_params())
            .header("Prefer", "return=representation");
        let response = self.send(table, request).await?;
        Ok(Self::representation(response).await?.len())
    }
}
