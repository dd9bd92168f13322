// =============================================================================
// Advisor — optional LLM narrative enrichment (§4.9)
// =============================================================================
//
// Wraps a single HTTP call to an LLM completion endpoint with a bounded
// retry loop and a small response cache so repeated requests for the same
// prompt (e.g. unchanged consensus between analysis cycles) don't re-spend
// tokens. Entirely optional: callers fall back to the template narrative
// from `hub::narrative` when no advisor is configured or the call fails.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAYS_MS: [u64; 3] = [1000, 2000, 4000];

const CACHE_CAPACITY: usize = 50;
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    response: Value,
    inserted_at: Instant,
}

/// LRU-by-insertion cache keyed by the SHA-256 of the prompt text.
struct PromptCache {
    entries: HashMap<String, CacheEntry>,
    order: Vec<String>,
}

impl PromptCache {
    fn new() -> Self {
        Self { entries: HashMap::new(), order: Vec::new() }
    }

    fn get(&mut self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() > CACHE_TTL {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
            return None;
        }
        Some(entry.response.clone())
    }

    fn insert(&mut self, key: String, response: Value) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key.clone(), CacheEntry { response, inserted_at: Instant::now() });

        while self.order.len() > CACHE_CAPACITY {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }
}

fn prompt_key(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Client for the Gemini `generateContent` endpoint (the only LLM the
/// fleet's `.env` surface names — see `GEMINI_API_KEY`/`VITE_API_KEY`).
pub struct Advisor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    cache: Mutex<PromptCache>,
}

impl Advisor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(GEMINI_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            cache: Mutex::new(PromptCache::new()),
        }
    }

    /// Sends `prompt` to the configured LLM and returns the decoded JSON
    /// object embedded in its completion, or `None` on any failure — network,
    /// timeout, non-2xx, or a completion with no parseable `{...}` substring.
    /// Never propagates an error: advisory enrichment is always optional.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn call(&self, prompt: &str) -> Option<Value> {
        let key = prompt_key(prompt);
        if let Some(cached) = self.cache.lock().get(&key) {
            return Some(cached);
        }

        let result = self.complete_with_retry(prompt).await;
        match result {
            Ok(value) => {
                self.cache.lock().insert(key, value.clone());
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "advisor call failed — proceeding without enrichment");
                None
            }
        }
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<Value> {
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.1},
        });

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            let request = self
                .client
                .post(&self.endpoint)
                .query(&[("key", &self.api_key)])
                .json(&body);

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let value: Value = resp.json().await.context("failed to parse LLM response body")?;
                    let text = extract_completion_text(&value)?;
                    return extract_json_object(&text);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    warn!(attempt = attempt + 1, %status, "advisor request rejected");
                    last_err = Some(anyhow::anyhow!("advisor endpoint returned {status}: {text}"));
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "advisor request failed");
                    last_err = Some(anyhow::anyhow!(e));
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAYS_MS[attempt as usize])).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("advisor exhausted retries with no error recorded")))
    }
}

/// Pulls the completion text out of a Gemini `generateContent` response body.
fn extract_completion_text(value: &Value) -> Result<String> {
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("advisor response contained no completion text")
}

/// Extracts the first `{...}` substring of `text` and decodes it as JSON,
/// per §4.9 — models often wrap the JSON payload in surrounding prose.
fn extract_json_object(text: &str) -> Result<Value> {
    let start = text.find('{').context("no '{' found in advisor completion")?;
    let end = text.rfind('}').context("no '}' found in advisor completion")?;
    if end <= start {
        bail!("advisor completion has no well-formed {{...}} span");
    }
    serde_json::from_str(&text[start..=end]).context("advisor completion braces did not contain valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_key_is_stable_for_identical_input() {
        assert_eq!(prompt_key("hello"), prompt_key("hello"));
        assert_ne!(prompt_key("hello"), prompt_key("world"));
    }

    #[test]
    fn cache_evicts_oldest_past_capacity() {
        let mut cache = PromptCache::new();
        for i in 0..CACHE_CAPACITY + 5 {
            cache.insert(format!("key-{i}"), serde_json::json!({"i": i}));
        }
        assert_eq!(cache.entries.len(), CACHE_CAPACITY);
        assert!(cache.get("key-0").is_none());
        assert!(cache.get(&format!("key-{}", CACHE_CAPACITY + 4)).is_some());
    }

    #[test]
    fn extract_completion_text_reads_gemini_shape() {
        let value = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "the narrative"}]}}]
        });
        assert_eq!(extract_completion_text(&value).unwrap(), "the narrative");
    }

    #[test]
    fn extract_completion_text_errors_without_candidates() {
        let value = serde_json::json!({ "error": "blocked" });
        assert!(extract_completion_text(&value).is_err());
    }

    #[test]
    fn extract_json_object_scans_first_braces_span() {
        let text = "preamble {\"summary\":\"ok\"} trailing";
        let extracted = extract_json_object(text).unwrap();
        assert_eq!(extracted, serde_json::json!({"summary": "ok"}));
    }

    #[test]
    fn extract_json_object_errors_on_no_braces() {
        assert!(extract_json_object("no json here").is_err());
    }

    #[test]
    fn extract_json_object_errors_on_malformed_braces_content() {
        assert!(extract_json_object("{not valid json}").is_err());
    }
}
