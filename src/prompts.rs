//! Analysis prompt templates.
//!
//! Each analysis kind has one template per [`PromptVariant`]: a heading
//! naming the work item, the facts it draws on, and the questions the model
//! should answer.

use crate::models::{AnalysisKind, FactValue, WorkItem};
use std::fmt::Write as _;

/// Well-known fact names produced by the bundled work sources.
pub mod facts {
    pub const PRICE: &str = "price";
    pub const REVENUE_BILLIONS: &str = "revenue_billions";
    pub const SENTIMENT: &str = "sentiment";
    pub const RISK_SCORE: &str = "risk_score";
    pub const RISK_CATEGORY: &str = "risk_category";
    /// Market beta of a live quote.
    pub const BETA: &str = "beta";
}

/// Which template set fits a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Generated snapshot facts with a 1-10 risk score.
    Snapshot,
    /// Live quote facts with a market beta.
    RealTime,
}

impl PromptVariant {
    /// Items carrying a beta come from live quotes.
    pub fn for_item(item: &WorkItem) -> Self {
        if item.fact(facts::BETA).is_some() {
            PromptVariant::RealTime
        } else {
            PromptVariant::Snapshot
        }
    }
}

/// How a fact is printed inside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactFormat {
    Plain,
    Dollars,
    Billions,
    OutOfTen,
}

/// One fact line of a template.
#[derive(Debug)]
pub struct FactLine {
    pub label: &'static str,
    pub key: &'static str,
    pub format: FactFormat,
    /// Omit the line entirely when the item lacks this fact.
    pub optional: bool,
}

/// Prompt template for one analysis kind.
#[derive(Debug)]
pub struct PromptTemplate {
    pub kind: AnalysisKind,
    /// Heading; `{item}` is replaced by the work item id.
    pub heading: &'static str,
    pub facts: &'static [FactLine],
    pub instruction: &'static str,
    pub questions: &'static [&'static str],
}

impl PromptTemplate {
    /// Render the prompt for a work item.
    pub fn render(&self, item: &WorkItem) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.heading.replace("{item}", item.id()));
        prompt.push('\n');

        for line in self.facts {
            let value = match item.fact(line.key) {
                Some(value) => format_fact(value, line.format),
                None if line.optional => continue,
                None => FactValue::Missing.to_string(),
            };
            let _ = writeln!(prompt, "- {}: {}", line.label, value);
        }

        prompt.push('\n');
        prompt.push_str(self.instruction);
        prompt.push('\n');
        for (i, question) in self.questions.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, question.replace("{item}", item.id()));
        }

        prompt
    }
}

fn format_fact(value: &FactValue, format: FactFormat) -> String {
    match (value, format) {
        (FactValue::Number(n), FactFormat::Dollars) => format!("${:.2}", n),
        (FactValue::Number(n), FactFormat::Billions) => format!("${} billion", n),
        (FactValue::Number(n), FactFormat::OutOfTen) => format!("{}/10", n),
        (other, _) => other.to_string(),
    }
}

static PRICE_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Price,
    heading: "Analyze the current stock price for {item}:",
    facts: &[FactLine {
        label: "Current Price",
        key: facts::PRICE,
        format: FactFormat::Dollars,
        optional: false,
    }],
    instruction: "Please provide a brief analysis of the stock price, considering:",
    questions: &[
        "Whether this price point represents good value",
        "What this price suggests about the company's market position",
        "Key price levels and potential support/resistance points",
        "Any notable implications for investors",
    ],
};

static FINANCIAL_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Financial,
    heading: "Analyze the quarterly financial performance of {item}:",
    facts: &[FactLine {
        label: "Revenue",
        key: facts::REVENUE_BILLIONS,
        format: FactFormat::Billions,
        optional: false,
    }],
    instruction: "Please provide insights on:",
    questions: &[
        "The revenue scale relative to industry peers",
        "What this revenue suggests about company growth",
        "Key financial strengths and potential concerns",
        "Potential financial outlook based on this revenue",
    ],
};

static SENTIMENT_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Sentiment,
    heading: "Evaluate the market sentiment for {item}:",
    facts: &[FactLine {
        label: "Current Sentiment",
        key: facts::SENTIMENT,
        format: FactFormat::Plain,
        optional: false,
    }],
    instruction: "Please analyze:",
    questions: &[
        "What this sentiment level typically indicates",
        "Potential factors contributing to this sentiment",
        "How this sentiment might affect short-term trading",
    ],
};

static RISK_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Risk,
    heading: "Assess the investment risk profile for {item}:",
    facts: &[
        FactLine {
            label: "Risk Score",
            key: facts::RISK_SCORE,
            format: FactFormat::OutOfTen,
            optional: false,
        },
        FactLine {
            label: "Risk Category",
            key: facts::RISK_CATEGORY,
            format: FactFormat::Plain,
            optional: true,
        },
    ],
    instruction: "Please provide:",
    questions: &[
        "An interpretation of the risk score and category",
        "What this risk level means for different types of investors",
        "Risk factors specific to {item}'s sector",
        "Recommendations for risk management",
    ],
};

static LIVE_PRICE_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Price,
    heading: "Analyze the real-time stock price for {item}:",
    facts: &[FactLine {
        label: "Current Price",
        key: facts::PRICE,
        format: FactFormat::Dollars,
        optional: false,
    }],
    instruction: "Please provide a brief analysis of the stock price, considering:",
    questions: &[
        "Current price movement and trading patterns",
        "What this price suggests about market confidence",
        "Key price levels and potential support/resistance points",
        "Notable implications for day traders and investors",
    ],
};

static LIVE_FINANCIAL_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Financial,
    heading: "Analyze the financial metrics for {item}:",
    facts: &[FactLine {
        label: "Total Revenue",
        key: facts::REVENUE_BILLIONS,
        format: FactFormat::Billions,
        optional: false,
    }],
    instruction: "Please provide insights on:",
    questions: &[
        "The company's revenue performance compared to industry peers",
        "Key financial strengths and potential concerns",
        "Revenue growth trajectory and sustainability",
        "Impact on company's market position",
    ],
};

static LIVE_SENTIMENT_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Sentiment,
    heading: "Evaluate the current market sentiment for {item}:",
    facts: &[FactLine {
        label: "Market Sentiment",
        key: facts::SENTIMENT,
        format: FactFormat::Plain,
        optional: false,
    }],
    instruction: "Please analyze:",
    questions: &[
        "Current market perception and investor confidence",
        "Recent news and events affecting sentiment",
        "Social media and institutional investor sentiment",
        "Potential short-term sentiment shifts and catalysts",
    ],
};

static LIVE_RISK_TEMPLATE: PromptTemplate = PromptTemplate {
    kind: AnalysisKind::Risk,
    heading: "Assess the real-time risk profile for {item}:",
    facts: &[FactLine {
        label: "Beta (Risk Score)",
        key: facts::BETA,
        format: FactFormat::Plain,
        optional: false,
    }],
    instruction: "Please provide:",
    questions: &[
        "Interpretation of the current beta value",
        "Volatility analysis compared to market average",
        "Risk factors specific to {item}'s sector",
        "Recommendations for risk management",
    ],
};

/// Template for an analysis kind in one variant.
pub fn template_for(kind: AnalysisKind, variant: PromptVariant) -> &'static PromptTemplate {
    match (variant, kind) {
        (PromptVariant::Snapshot, AnalysisKind::Price) => &PRICE_TEMPLATE,
        (PromptVariant::Snapshot, AnalysisKind::Financial) => &FINANCIAL_TEMPLATE,
        (PromptVariant::Snapshot, AnalysisKind::Sentiment) => &SENTIMENT_TEMPLATE,
        (PromptVariant::Snapshot, AnalysisKind::Risk) => &RISK_TEMPLATE,
        (PromptVariant::RealTime, AnalysisKind::Price) => &LIVE_PRICE_TEMPLATE,
        (PromptVariant::RealTime, AnalysisKind::Financial) => &LIVE_FINANCIAL_TEMPLATE,
        (PromptVariant::RealTime, AnalysisKind::Sentiment) => &LIVE_SENTIMENT_TEMPLATE,
        (PromptVariant::RealTime, AnalysisKind::Risk) => &LIVE_RISK_TEMPLATE,
    }
}

/// Template for an analysis kind, picked by the facts the item carries.
pub fn template_for_item(kind: AnalysisKind, item: &WorkItem) -> &'static PromptTemplate {
    template_for(kind, PromptVariant::for_item(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> WorkItem {
        WorkItem::new("Acme")
            .with_fact(facts::PRICE, FactValue::Number(123.4))
            .with_fact(facts::SENTIMENT, FactValue::Label("Neutral".into()))
            .with_fact(facts::RISK_SCORE, FactValue::Number(7.5))
    }

    fn live_acme() -> WorkItem {
        WorkItem::new("Acme")
            .with_fact(facts::PRICE, FactValue::Number(189.84))
            .with_fact(facts::REVENUE_BILLIONS, FactValue::Number(383.29))
            .with_fact(facts::SENTIMENT, FactValue::Label("Neutral".into()))
            .with_fact(facts::BETA, FactValue::Number(1.26))
    }

    #[test]
    fn test_template_kinds_match() {
        for variant in [PromptVariant::Snapshot, PromptVariant::RealTime] {
            for kind in AnalysisKind::ALL {
                assert_eq!(template_for(kind, variant).kind, kind);
            }
        }
    }

    #[test]
    fn test_variant_follows_beta_fact() {
        assert_eq!(PromptVariant::for_item(&acme()), PromptVariant::Snapshot);
        assert_eq!(PromptVariant::for_item(&live_acme()), PromptVariant::RealTime);
    }

    #[test]
    fn test_render_price() {
        let prompt = template_for_item(AnalysisKind::Price, &acme()).render(&acme());
        assert!(prompt.starts_with("Analyze the current stock price for Acme:"));
        assert!(prompt.contains("- Current Price: $123.40"));
        assert!(prompt.contains("1. Whether this price point represents good value"));
        assert!(prompt.contains("4. Any notable implications for investors"));
    }

    #[test]
    fn test_render_missing_fact_is_na() {
        let prompt = template_for_item(AnalysisKind::Financial, &acme()).render(&acme());
        assert!(prompt.contains("- Revenue: N/A"));
    }

    #[test]
    fn test_render_optional_fact_omitted() {
        let prompt = template_for_item(AnalysisKind::Risk, &acme()).render(&acme());
        assert!(prompt.contains("- Risk Score: 7.5/10"));
        assert!(!prompt.contains("Risk Category"));
        assert!(prompt.contains("Risk factors specific to Acme's sector"));
    }

    #[test]
    fn test_render_live_risk_uses_beta() {
        let item = live_acme();
        let prompt = template_for_item(AnalysisKind::Risk, &item).render(&item);
        assert!(prompt.starts_with("Assess the real-time risk profile for Acme:"));
        assert!(prompt.contains("- Beta (Risk Score): 1.26\n"));
        assert!(prompt.contains("1. Interpretation of the current beta value"));
        assert!(!prompt.contains("/10"));
        assert!(!prompt.contains("category"));
    }

    #[test]
    fn test_render_live_financial() {
        let item = live_acme();
        let prompt = template_for_item(AnalysisKind::Financial, &item).render(&item);
        assert!(prompt.starts_with("Analyze the financial metrics for Acme:"));
        assert!(prompt.contains("- Total Revenue: $383.29 billion"));
        assert!(!prompt.contains("quarterly"));
    }
}
