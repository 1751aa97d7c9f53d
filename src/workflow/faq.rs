//! Small FAQ base used as reference context by the support chain.

use serde::{Deserialize, Serialize};

/// One FAQ entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub key: String,
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(key: &str, question: &str, answer: &str) -> Self {
        Self {
            key: key.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

/// Ordered collection of FAQ entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqBase {
    entries: Vec<FaqEntry>,
}

impl Default for FaqBase {
    fn default() -> Self {
        Self::new(default_entries())
    }
}

impl FaqBase {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&FaqEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Render all entries as `Q:`/`A:` pairs for a system prompt.
    pub fn context(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Built-in entries.
pub fn default_entries() -> Vec<FaqEntry> {
    vec![
        FaqEntry::new(
            "password",
            "How do I reset my password?",
            "You can reset your password by following these steps:\n\
             1. Go to the login page\n\
             2. Click 'Forgot Password'\n\
             3. Enter your email address\n\
             4. Follow the instructions in the reset email",
        ),
        FaqEntry::new(
            "business_hours",
            "What are your business hours?",
            "Our business hours are from 9 AM to 5 PM, Monday to Friday (EST). \
             We're closed on major holidays.",
        ),
        FaqEntry::new(
            "contact",
            "How do I contact support?",
            "You can contact support through multiple channels:\n\
             - Email: support@example.com\n\
             - Phone: +1-800-123-4567\n\
             - Live Chat: Available during business hours",
        ),
        FaqEntry::new(
            "order_history",
            "Where can I find my order history?",
            "To view your order history:\n\
             1. Log into your account\n\
             2. Click on 'My Account'\n\
             3. Select 'Order History'\n\
             4. You'll see all past orders with details",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entries() {
        let faq = FaqBase::default();
        assert_eq!(faq.entries().len(), 4);
        assert!(faq.get("contact").is_some());
        assert!(faq.get("refunds").is_none());
    }

    #[test]
    fn test_context_format() {
        let faq = FaqBase::new(vec![
            FaqEntry::new("a", "Q1?", "A1"),
            FaqEntry::new("b", "Q2?", "A2"),
        ]);
        assert_eq!(faq.context(), "Q: Q1?\nA: A1\nQ: Q2?\nA: A2");
    }
}
