//! API client for the churn prediction service

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

const USER_ID_HEADER: &str = "X-User-Id";
const USER_ROLE_HEADER: &str = "X-User-Role";

/// Identity forwarded to the service the way the auth proxy would
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

/// API client for the churn prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    identity: Identity,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, identity: Identity) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            identity,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    fn with_identity(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.identity.user_id {
            Some(user_id) => request.header(USER_ID_HEADER, user_id),
            None => request,
        };
        match &self.identity.role {
            Some(role) => request.header(USER_ROLE_HEADER, role),
            None => request,
        }
    }

    /// Send a request whose response is wrapped in the `{success, data}`
    /// envelope and unwrap it
    async fn send_enveloped<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>> {
        let response = self
            .with_identity(request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => return Err(e).context("Failed to parse response"),
        };

        if !status.is_success() || !envelope.success {
            let message = envelope
                .error
                .clone()
                .unwrap_or_else(|| "request failed".to_string());
            anyhow::bail!("API error ({}): {}", status, message);
        }
        Ok(envelope)
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send_enveloped(request)
            .await?
            .data
            .context("Response envelope carried no data")
    }

    /// Score one customer record
    pub async fn predict(&self, customer: &Value) -> Result<PredictionRecord> {
        let request = self.client.post(self.url("api/predict")?).json(customer);
        self.data(request).await
    }

    /// Fetch a page of the caller's prediction history
    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let request = self
            .client
            .get(self.url("api/history")?)
            .query(&query.to_params());
        self.data(request).await
    }

    /// Delete every stored prediction; requires the admin role
    pub async fn purge(&self) -> Result<PurgeResult> {
        let request = self.client.delete(self.url("api/history")?);
        let envelope: Envelope<PurgeResult> = self.send_enveloped(request).await?;
        let mut result = envelope.data.context("Response envelope carried no data")?;
        result.message = envelope.message;
        Ok(result)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let request = self.client.get(self.url("api/dashboard/stats")?);
        self.data(request).await
    }

    /// Service summary plus per-component health; neither is enveloped
    pub async fn health(&self) -> Result<HealthReport> {
        let summary: ServiceHealth = self.get_plain("api/health").await?;
        let components: ComponentReport = self.get_plain("healthz").await?;
        Ok(HealthReport {
            summary,
            components,
        })
    }

    /// GET an endpoint that answers with a bare JSON body. Probe
    /// endpoints report failure with 503 and a body, so the status is
    /// not treated as an error.
    async fn get_plain<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;
        response.json().await.context("Failed to parse response")
    }
}

/// Response envelope used by every `/api/*` route except health
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub feature: String,
    pub value: f64,
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub timestamp: String,
    pub customer_data: Value,
    pub prediction: String,
    pub probability: f64,
    pub risk_level: String,
    #[serde(default)]
    pub shap_values: Vec<Factor>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub predictions: Vec<PredictionRecord>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResult {
    pub deleted_count: u64,
    #[serde(skip)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_predictions: usize,
    pub churn_rate: f64,
    pub avg_probability: f64,
    pub high_risk_customers: usize,
    pub prediction_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub timestamp: String,
    pub database: String,
    pub models: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub status: String,
    #[serde(default)]
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub summary: ServiceHealth,
    pub components: ComponentReport,
}

/// History filters as passed on the command line
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub prediction: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_probability: Option<f64>,
    pub max_probability: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// Query-string pairs using the API's camelCase parameter names
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                params.push((name, value));
            }
        };
        push("prediction", self.prediction.clone());
        push("startDate", self.start_date.clone());
        push("endDate", self.end_date.clone());
        push("minProbability", self.min_probability.map(|p| p.to_string()));
        push("maxProbability", self.max_probability.map(|p| p.to_string()));
        push("sortBy", self.sort_by.clone());
        push("sortOrder", self.sort_order.clone());
        push("page", self.page.map(|p| p.to_string()));
        push("limit", self.limit.map(|l| l.to_string()));
        params
    }
}
