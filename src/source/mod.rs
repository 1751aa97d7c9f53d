//! Work sources: where the items to analyze come from.

mod live;

pub use live::{LiveMarketSource, DEFAULT_QUOTE_URL};

use crate::error::SourceError;
use crate::models::{FactValue, WorkItem};
use crate::prompts::facts;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Produces the work items of one batch.
///
/// A failing fetch is reported as a single error, never as partial data.
#[async_trait]
pub trait WorkSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<WorkItem>, SourceError>;
}

/// Fixed list of work items.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: Vec<WorkItem>,
}

impl StaticSource {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl WorkSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<WorkItem>, SourceError> {
        if self.items.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(self.items.clone())
    }
}

pub const DEFAULT_COMPANIES: [&str; 4] = [
    "Apple Inc.",
    "Tesla Motors",
    "Microsoft Corporation",
    "Amazon.com Inc.",
];

pub const SENTIMENT_LABELS: [&str; 5] = [
    "Strongly Bullish",
    "Moderately Bullish",
    "Neutral",
    "Moderately Bearish",
    "Strongly Bearish",
];

pub const RISK_CATEGORIES: [&str; 5] = [
    "Very Low Risk",
    "Low Risk",
    "Moderate Risk",
    "High Risk",
    "Very High Risk",
];

/// Random but plausible market facts for a list of companies.
#[derive(Debug, Clone)]
pub struct MockMarketSource {
    companies: Vec<String>,
    seed: Option<u64>,
}

impl Default for MockMarketSource {
    fn default() -> Self {
        Self::new(DEFAULT_COMPANIES.iter().map(|c| c.to_string()).collect())
    }
}

impl MockMarketSource {
    pub fn new(companies: Vec<String>) -> Self {
        Self {
            companies,
            seed: None,
        }
    }

    /// Make the generated facts reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn generate(&self, rng: &mut impl Rng, company: &str) -> WorkItem {
        let sentiment = SENTIMENT_LABELS.choose(rng).copied().unwrap_or("Neutral");
        let category = RISK_CATEGORIES.choose(rng).copied().unwrap_or("Moderate Risk");

        WorkItem::new(company)
            .with_fact(facts::PRICE, FactValue::Number(round_to(rng.gen_range(50.0..=500.0), 2)))
            .with_fact(
                facts::REVENUE_BILLIONS,
                FactValue::Number(round_to(rng.gen_range(10.0..=100.0), 2)),
            )
            .with_fact(facts::SENTIMENT, FactValue::Label(sentiment.to_string()))
            .with_fact(
                facts::RISK_SCORE,
                FactValue::Number(round_to(rng.gen_range(1.0..=10.0), 1)),
            )
            .with_fact(facts::RISK_CATEGORY, FactValue::Label(category.to_string()))
    }
}

#[async_trait]
impl WorkSource for MockMarketSource {
    async fn fetch(&self) -> Result<Vec<WorkItem>, SourceError> {
        if self.companies.is_empty() {
            return Err(SourceError::Empty);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let items: Vec<WorkItem> = self
            .companies
            .iter()
            .map(|company| self.generate(&mut rng, company))
            .collect();
        debug!("Generated mock market data for {} companies", items.len());
        Ok(items)
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
