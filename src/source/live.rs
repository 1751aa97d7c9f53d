//! Live market data from a Yahoo-style quote summary endpoint.

use super::{round_to, WorkSource};
use crate::error::SourceError;
use crate::models::{FactValue, WorkItem};
use crate::prompts::facts;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_QUOTE_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

const MODULES: &str = "price,financialData,defaultKeyStatistics";
const SENTIMENT_PLACEHOLDER: &str = "Neutral";
const DEFAULT_BETA: f64 = 1.0;
const QUOTE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteModules>>,
    #[serde(default)]
    error: Option<QuoteError>,
}

#[derive(Debug, Deserialize)]
struct QuoteError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteModules {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    financial_data: Option<FinancialData>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    regular_market_price: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    #[serde(default)]
    total_revenue: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    #[serde(default)]
    beta: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

/// Fetches price, revenue and beta for a list of (company, ticker) pairs.
///
/// Quotes are fetched concurrently; one failing ticker fails the whole fetch.
#[derive(Debug, Clone)]
pub struct LiveMarketSource {
    client: Client,
    quote_url: String,
    tickers: Vec<(String, String)>,
}

impl LiveMarketSource {
    pub fn new(tickers: Vec<(String, String)>) -> Result<Self, reqwest::Error> {
        Self::with_quote_url(tickers, DEFAULT_QUOTE_URL)
    }

    /// Use a different quote endpoint (tests, proxies).
    pub fn with_quote_url(
        tickers: Vec<(String, String)>,
        quote_url: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("llm-fanout/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(QUOTE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            quote_url: quote_url.trim_end_matches('/').to_string(),
            tickers,
        })
    }

    pub fn default_tickers() -> Vec<(String, String)> {
        [("Apple", "AAPL"), ("Tesla", "TSLA"), ("Microsoft", "MSFT")]
            .iter()
            .map(|(company, ticker)| (company.to_string(), ticker.to_string()))
            .collect()
    }

    async fn fetch_one(&self, company: &str, ticker: &str) -> Result<WorkItem, SourceError> {
        let url = format!("{}/{}", self.quote_url, ticker);
        debug!("Fetching quote for {} from {}", ticker, url);

        let http_err = |source| SourceError::Http {
            ticker: ticker.to_string(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .query(&[("modules", MODULES)])
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        let body: QuoteSummaryResponse = response.json().await.map_err(http_err)?;
        if let Some(error) = body.quote_summary.error {
            return Err(SourceError::Upstream {
                ticker: ticker.to_string(),
                message: format!("{}: {}", error.code, error.description),
            });
        }

        let modules = body
            .quote_summary
            .result
            .and_then(|mut r| (!r.is_empty()).then(|| r.swap_remove(0)))
            .ok_or(SourceError::MissingField {
                ticker: ticker.to_string(),
                field: "result",
            })?;

        to_work_item(company, ticker, modules)
    }
}

fn to_work_item(company: &str, ticker: &str, modules: QuoteModules) -> Result<WorkItem, SourceError> {
    let price = modules
        .price
        .as_ref()
        .and_then(|p| raw(&p.regular_market_price))
        .ok_or(SourceError::MissingField {
            ticker: ticker.to_string(),
            field: "regularMarketPrice",
        })?;

    let revenue = modules
        .financial_data
        .as_ref()
        .and_then(|f| raw(&f.total_revenue))
        .map(|r| FactValue::Number(round_to(r / 1e9, 2)))
        .unwrap_or(FactValue::Missing);

    let beta = modules
        .default_key_statistics
        .as_ref()
        .and_then(|k| raw(&k.beta))
        .unwrap_or(DEFAULT_BETA);

    Ok(WorkItem::new(company)
        .with_fact(facts::PRICE, FactValue::Number(round_to(price, 2)))
        .with_fact(facts::REVENUE_BILLIONS, revenue)
        .with_fact(facts::SENTIMENT, FactValue::Label(SENTIMENT_PLACEHOLDER.to_string()))
        .with_fact(facts::BETA, FactValue::Number(round_to(beta, 2))))
}

#[async_trait]
impl WorkSource for LiveMarketSource {
    async fn fetch(&self) -> Result<Vec<WorkItem>, SourceError> {
        if self.tickers.is_empty() {
            return Err(SourceError::Empty);
        }

        let items = try_join_all(
            self.tickers
                .iter()
                .map(|(company, ticker)| self.fetch_one(company, ticker)),
        )
        .await?;

        info!("Fetched live quotes for {} companies", items.len());
        Ok(items)
    }
}
