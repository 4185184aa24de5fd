use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StructuringError;
use crate::llm::CompletionClient;
use crate::report::{TrafficReport, MIN_ITEMS, REQUIRED_KEYS};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Instruction prompt wrapping the extracted page text.
pub fn build_prompt(page_text: &str) -> String {
    format!(
        r#"You are analyzing content from the Bengaluru Traffic Police website.
Return ONLY a valid JSON object with this exact structure:
{{
  "alerts": ["alert1", "alert2", "alert3", "alert4", "alert5"],
  "events": ["event1", "event2", "event3", "event4", "event5"],
  "news": ["news1", "news2", "news3", "news4", "news5"]
}}
Rules:
- Each array must have at least {min} items.
- Each item must be a clear, detailed sentence (60-120 chars).
- Return ONLY the JSON object, no other text.
Website content:
{page_text}
"#,
        min = MIN_ITEMS,
    )
}

/// Ask the model to categorize `page_text` and validate what comes back.
pub async fn structure(
    client: &dyn CompletionClient,
    page_text: &str,
) -> Result<TrafficReport, StructuringError> {
    let prompt = build_prompt(page_text);
    let output = client.complete(&prompt).await?;
    debug!("Model answered with {} chars", output.chars().count());
    parse_report(&output)
}

/// Body of a fenced code block, or the trimmed input when it is not fenced.
///
/// Only a fence that opens the output counts; the body runs up to the next fence.
pub fn strip_fence(output: &str) -> &str {
    let trimmed = output.trim();
    let body = if let Some(rest) = trimmed.strip_prefix(JSON_FENCE) {
        rest
    } else if let Some(rest) = trimmed.strip_prefix(FENCE) {
        // Bare fence: drop whatever info string follows on the opening line.
        rest.split_once('\n').map_or("", |(_, body)| body)
    } else {
        return trimmed;
    };
    body.split(FENCE).next().unwrap_or(body)
}

/// Decode model output into a report. Only key presence and string-array
/// shape are checked; item counts and lengths are left to the model.
pub fn parse_report(output: &str) -> Result<TrafficReport, StructuringError> {
    let cleaned = strip_fence(output);
    let value: Value = serde_json::from_str(cleaned).map_err(StructuringError::ParseFailure)?;

    let Some(obj) = value.as_object() else {
        return Err(StructuringError::SchemaViolation(format!(
            "expected a JSON object, got {}",
            type_name(&value)
        )));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(StructuringError::SchemaViolation(format!(
            "missing required keys: {}",
            missing.join(", ")
        )));
    }

    let report = TrafficReport {
        alerts: string_list(obj, "alerts")?,
        events: string_list(obj, "events")?,
        news: string_list(obj, "news")?,
    };

    let short = report.short_categories();
    if !short.is_empty() {
        warn!(
            "Model returned fewer than {} items for: {}",
            MIN_ITEMS,
            short.join(", ")
        );
    }

    Ok(report)
}

fn string_list(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Vec<String>, StructuringError> {
    let items = obj[key].as_array().ok_or_else(|| {
        StructuringError::SchemaViolation(format!(
            "\"{}\" must be an array, got {}",
            key,
            type_name(&obj[key])
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                StructuringError::SchemaViolation(format!(
                    "\"{}\"[{}] must be a string, got {}",
                    key,
                    i,
                    type_name(item)
                ))
            })
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use std::sync::Mutex;

    const FIVE_EACH: &str = r#"{"alerts":["a1","a2","a3","a4","a5"],"events":["e1","e2","e3","e4","e5"],"news":["n1","n2","n3","n4","n5"]}"#;

    fn five_each() -> TrafficReport {
        TrafficReport {
            alerts: vec!["a1", "a2", "a3", "a4", "a5"].into_iter().map(String::from).collect(),
            events: vec!["e1", "e2", "e3", "e4", "e5"].into_iter().map(String::from).collect(),
            news: vec!["n1", "n2", "n3", "n4", "n5"].into_iter().map(String::from).collect(),
        }
    }

    struct Canned {
        answer: Result<String, ()>,
        seen: Mutex<Option<String>>,
    }

    impl Canned {
        fn ok(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            *self.seen.lock().unwrap() = Some(prompt.to_string());
            self.answer.clone().map_err(|_| CompletionError::EmptyResponse)
        }
    }

    #[test]
    fn plain_json() {
        assert_eq!(parse_report(FIVE_EACH).unwrap(), five_each());
    }

    #[test]
    fn fenced_json_matches_plain() {
        let fenced = format!("```json\n{}\n```", FIVE_EACH);
        assert_eq!(parse_report(&fenced).unwrap(), parse_report(FIVE_EACH).unwrap());
    }

    #[test]
    fn bare_fence_and_surrounding_whitespace() {
        let fenced = format!("\n  ```\n{}\n```  \n", FIVE_EACH);
        assert_eq!(parse_report(&fenced).unwrap(), five_each());
    }

    #[test]
    fn text_after_closing_fence_ignored() {
        let fenced = format!("```json\n{}\n```\nHope this helps!", FIVE_EACH);
        assert_eq!(parse_report(&fenced).unwrap(), five_each());
    }

    #[test]
    fn strip_fence_cases() {
        assert_eq!(strip_fence("```json\n{}\n```"), "\n{}\n");
        assert_eq!(strip_fence("```json{}```"), "{}");
        assert_eq!(strip_fence("```javascript\n[1]\n```"), "[1]\n");
        assert_eq!(strip_fence("  {\"a\":1} "), "{\"a\":1}");
        // A fence that does not open the output is left alone.
        assert_eq!(strip_fence("Here:\n```json\n{}\n```"), "Here:\n```json\n{}\n```");
    }

    #[test]
    fn missing_events_is_schema_violation() {
        let err = parse_report(r#"{"alerts":["a1"],"news":["n1"]}"#).unwrap_err();
        match err {
            StructuringError::SchemaViolation(msg) => assert!(msg.contains("events")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn prose_is_parse_failure() {
        let err = parse_report("I could not find any traffic updates on that page.").unwrap_err();
        assert!(matches!(err, StructuringError::ParseFailure(_)));
    }

    #[test]
    fn non_object_is_schema_violation() {
        let err = parse_report(r#"["a1","a2"]"#).unwrap_err();
        assert!(matches!(err, StructuringError::SchemaViolation(_)));
    }

    #[test]
    fn wrong_item_types_are_schema_violations() {
        let err = parse_report(r#"{"alerts":"a1","events":[],"news":[]}"#).unwrap_err();
        assert!(matches!(err, StructuringError::SchemaViolation(ref m) if m.contains("alerts")));

        let err = parse_report(r#"{"alerts":[],"events":[1],"news":[]}"#).unwrap_err();
        assert!(matches!(err, StructuringError::SchemaViolation(ref m) if m.contains("events")));
    }

    #[test]
    fn short_lists_accepted_and_extra_keys_dropped() {
        let report = parse_report(r#"{"alerts":["a1"],"events":[],"news":["n1"],"status":"live"}"#).unwrap();
        assert_eq!(report.alerts, vec!["a1"]);
        assert!(report.events.is_empty());
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("status").is_none());
    }

    #[test]
    fn prompt_embeds_text_and_rules() {
        let prompt = build_prompt("Hebbal flyover closed");
        assert!(prompt.contains("Hebbal flyover closed"));
        assert!(prompt.contains("at least 5 items"));
        assert!(prompt.contains("60-120 chars"));
        assert!(prompt.contains("\"alerts\""));
        assert!(prompt.contains("\"events\""));
        assert!(prompt.contains("\"news\""));
    }

    #[tokio::test]
    async fn structure_sends_prompt_and_parses_answer() {
        let llm = Canned::ok(&format!("```json\n{}\n```", FIVE_EACH));
        let report = structure(&llm, "page text here").await.unwrap();
        assert_eq!(report, five_each());
        let seen = llm.seen.lock().unwrap().clone().unwrap();
        assert!(seen.contains("page text here"));
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let llm = Canned {
            answer: Err(()),
            seen: Mutex::new(None),
        };
        let err = structure(&llm, "text").await.unwrap_err();
        assert!(matches!(err, StructuringError::Completion(CompletionError::EmptyResponse)));
    }
}
