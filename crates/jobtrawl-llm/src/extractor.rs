//! Structured record extraction from listing text.
//!
//! The extractor asks the model for the fixed listing schema only. Identity,
//! source URL and search keyword are never part of the prompt; the pipeline
//! stamps them afterwards so the model cannot invent them.

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, LlmProvider, TokenCount};
use async_trait::async_trait;
use jobtrawl_core::{LlmConfig, StructuredRecord};
use std::sync::Arc;
use tracing::debug;

/// JSON schema of the structured record, embedded in every prompt.
pub const RECORD_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "title": {"type": ["string", "null"], "description": "Job title"},
    "organization": {"type": ["string", "null"], "description": "Hiring organization"},
    "responsibilities": {
      "type": "array", "items": {"type": "string"}, "description": "Task responsibilities"
    },
    "qualifications": {
      "type": "array", "items": {"type": "string"}, "description": "Required qualifications"
    },
    "experiences": {
      "type": "array", "items": {"type": "string"}, "description": "Working experience requirements"
    },
    "skills": {
      "type": "array", "items": {"type": "string"}, "description": "Technical and soft skills"
    },
    "salary": {"type": ["string", "null"], "description": "Salary as written in the listing"},
    "location": {"type": ["string", "null"], "description": "Working location"}
  }
}"#;

const SYSTEM_PROMPT: &str = "You extract structured information from job advertisements. \
Use only information present in the advertisement; do not add anything that is not there. \
Leave a field null or an empty list when the advertisement does not mention it. \
Return ONLY valid JSON. No explanation.";

/// Enrichment collaborator: turns listing text into a structured record.
#[async_trait]
pub trait RecordExtractor: Send + Sync {
    /// Infer a structured record from extracted listing text.
    ///
    /// # Errors
    /// Returns error if inference fails or its output does not match the schema.
    async fn infer(&self, text: &str) -> Result<StructuredRecord>;
}

/// [`RecordExtractor`] backed by an [`LlmProvider`].
pub struct LlmRecordExtractor {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmRecordExtractor {
    /// Create an extractor with the sampling settings from `config`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_request(&self, text: &str) -> CompletionRequest {
        let prompt = format!(
            "Extract structured information from the job advertisement below.\n\n\
             You MUST return JSON that strictly follows this JSON Schema:\n\n\
             {RECORD_SCHEMA}\n\n\
             Job advertisement:\n\
             ------------------\n\
             {text}\n\n\
             Return ONLY valid JSON. No explanation."
        );

        CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_sampling(self.temperature, self.max_tokens)
            .json()
    }
}

#[async_trait]
impl RecordExtractor for LlmRecordExtractor {
    async fn infer(&self, text: &str) -> Result<StructuredRecord> {
        let completion = self.provider.complete(&self.build_request(text)).await?;
        debug!(
            provider = self.provider.provider_id(),
            model = %completion.model,
            chars = completion.text.len(),
            tokens = completion.tokens.map(TokenCount::total),
            finish = completion.finish_reason.as_deref(),
            "received extraction output"
        );
        parse_record(self.provider.provider_id(), &completion.text)
    }
}

/// Parse model output into a structured record.
///
/// Markdown code fences and text around the outermost JSON object are
/// tolerated. Anything else that does not deserialize into the schema is a
/// [`LlmError::Schema`].
pub fn parse_record(provider: &str, output: &str) -> Result<StructuredRecord> {
    let schema_error = |reason: String| LlmError::Schema {
        provider: provider.to_string(),
        reason,
    };

    let body = strip_code_fence(output.trim());
    let start = body.find('{');
    let end = body.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(schema_error("no JSON object in output".to_string())),
    };

    serde_json::from_str::<StructuredRecord>(json)
        .map(StructuredRecord::normalized)
        .map_err(|e| schema_error(e.to_string()))
}

fn strip_code_fence(output: &str) -> &str {
    let Some(rest) = output.strip_prefix("```") else {
        return output;
    };
    // Drop the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use std::sync::Mutex;

    struct ScriptedProvider {
        output: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(output: &str) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            self.seen.lock().expect("lock").push(request.clone());
            Ok(Completion {
                text: self.output.clone(),
                model: "scripted".to_string(),
                finish_reason: Some("stop".to_string()),
                tokens: None,
            })
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn is_local(&self) -> bool {
            true
        }

        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let record = parse_record(
            "test",
            r#"{"title": "Data Analyst", "organization": "Acme", "skills": ["SQL", "Python"]}"#,
        )
        .expect("valid output");

        assert_eq!(record.title.as_deref(), Some("Data Analyst"));
        assert_eq!(record.organization.as_deref(), Some("Acme"));
        assert_eq!(record.skills, vec!["SQL", "Python"]);
        assert!(record.salary.is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let output = "```json\n{\"title\": \"BI Developer\", \"location\": \"Kowloon\"}\n```";
        let record = parse_record("test", output).expect("fenced output");
        assert_eq!(record.title.as_deref(), Some("BI Developer"));
        assert_eq!(record.location.as_deref(), Some("Kowloon"));
    }

    #[test]
    fn test_parse_with_leading_prose() {
        let output = "Here is the JSON:\n{\"title\": \"Analyst\"}";
        let record = parse_record("test", output).expect("output with prose");
        assert_eq!(record.title.as_deref(), Some("Analyst"));
    }

    #[test]
    fn test_parse_empty_object_is_partial_not_error() {
        let record = parse_record("test", "{}").expect("empty object");
        assert_eq!(record, StructuredRecord::default());
    }

    #[test]
    fn test_malformed_output_is_error() {
        assert!(matches!(
            parse_record("test", "I could not find a job here."),
            Err(LlmError::Schema { .. })
        ));
        assert!(matches!(
            parse_record("test", r#"{"title": "Analyst", "skills": "#),
            Err(LlmError::Schema { .. })
        ));
    }

    #[test]
    fn test_wrong_type_is_error() {
        let result = parse_record("test", r#"{"skills": "SQL, Python"}"#);
        assert!(matches!(result, Err(LlmError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_infer_sends_schema_prompt() {
        let provider = ScriptedProvider::new(r#"{"title": "Data Analyst"}"#);
        let extractor = LlmRecordExtractor::new(provider.clone(), &LlmConfig::default());

        let record = extractor
            .infer("Data Analyst at Acme. Skills: SQL.")
            .await
            .expect("inference succeeds");
        assert_eq!(record.title.as_deref(), Some("Data Analyst"));

        let seen = provider.seen.lock().expect("lock");
        let request = &seen[0];
        assert!(request.json_output);
        assert_eq!(request.sampling.temperature, Some(0.1));
        assert_eq!(request.sampling.max_tokens, Some(1000));
        assert!(request.system.is_some());
        assert!(request.prompt.contains("\"responsibilities\""));
        assert!(request.prompt.contains("Data Analyst at Acme."));
        assert!(!request.prompt.contains("identity"));
        assert!(!request.prompt.contains("search_keyword"));
    }
}
