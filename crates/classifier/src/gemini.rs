//! Gemini-backed classifier.
//!
//! Calls the `generateContent` endpoint with a JSON response schema so the
//! model is constrained to the triage contract; the reply is still treated
//! as untrusted and re-validated before it reaches any store.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use triagedesk_core::TriageOutcome;

use crate::result::{ClassifierError, validate_outcome};
use crate::traits::Classifier;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClassifier {
    /// Build a classifier. Fails fast when the key is empty so a
    /// misconfigured worker never starts consuming.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClassifierError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ClassifierError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(content: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{
                    "text": format!(
                        "Analyze the following customer ticket and provide triage data:\n\n\"{content}\""
                    ),
                }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "category": {
                            "type": "STRING",
                            "enum": ["BILLING", "TECHNICAL", "FEATURE_REQUEST"],
                        },
                        "sentiment": { "type": "INTEGER" },
                        "urgency": {
                            "type": "STRING",
                            "enum": ["HIGH", "MEDIUM", "LOW"],
                        },
                        "draft": { "type": "STRING" },
                    },
                    "required": ["category", "sentiment", "urgency", "draft"],
                },
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

/// Pull the model's JSON text out of the response envelope and parse it
/// into the triage contract.
pub(crate) fn parse_response(body: &str) -> Result<TriageOutcome, ClassifierError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ClassifierError::Malformed(format!("response envelope: {e}")))?;

    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.as_str())
        .ok_or_else(|| ClassifierError::Malformed("no candidates in response".to_string()))?;

    let outcome: TriageOutcome = serde_json::from_str(text)
        .map_err(|e| ClassifierError::Malformed(format!("triage payload: {e}")))?;

    validate_outcome(&outcome)?;
    Ok(outcome)
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn triage(&self, content: &str) -> Result<TriageOutcome, ClassifierError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(content))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClassifierError::Malformed(format!(
                "upstream returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let outcome = parse_response(&body)?;
        tracing::debug!(
            category = outcome.category.as_str(),
            urgency = outcome.urgency.as_str(),
            sentiment = outcome.sentiment,
            "triage completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triagedesk_core::{Category, Urgency};

    fn envelope(text: &str) -> String {
        serde_json::to_string(&json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        }))
        .unwrap()
    }

    #[test]
    fn parses_a_conforming_response() {
        let body = envelope(
            r#"{"category":"TECHNICAL","sentiment":3,"urgency":"HIGH","draft":"Sorry about the crash."}"#,
        );
        let outcome = parse_response(&body).unwrap();
        assert_eq!(outcome.category, Category::Technical);
        assert_eq!(outcome.sentiment, 3);
        assert_eq!(outcome.urgency, Urgency::High);
        assert_eq!(outcome.draft, "Sorry about the crash.");
    }

    #[test]
    fn rejects_unknown_category() {
        let body = envelope(
            r#"{"category":"GOSSIP","sentiment":3,"urgency":"HIGH","draft":"hm"}"#,
        );
        assert!(matches!(
            parse_response(&body),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_sentiment() {
        let body = envelope(
            r#"{"category":"BILLING","sentiment":42,"urgency":"LOW","draft":"hi"}"#,
        );
        assert!(matches!(
            parse_response(&body),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_empty_candidates() {
        assert!(matches!(
            parse_response(r#"{"candidates":[]}"#),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_json_payload_text() {
        let body = envelope("I'd be happy to help triage this ticket!");
        assert!(matches!(
            parse_response(&body),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn empty_key_is_rejected_at_construction() {
        assert!(matches!(
            GeminiClassifier::new(""),
            Err(ClassifierError::MissingApiKey)
        ));
    }
}
