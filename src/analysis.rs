use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::AppConfig;

pub const SENTIMENT_POSITIVE: &str = "positive";
pub const SENTIMENT_NEGATIVE: &str = "negative";
pub const SENTIMENT_NEUTRAL: &str = "neutral";

pub const INTEREST_HOT: &str = "hot";
pub const INTEREST_WARM: &str = "warm";
pub const INTEREST_COLD: &str = "cold";

pub const OBJECTION_NONE: &str = "none";

const LLM_INSTRUCTION: &str = "You are a sales call analyst. Given a call transcript, \
its duration in seconds and whether a meeting was booked, respond with strict JSON and \
nothing else, exactly this shape: {\"sentiment\": \"positive|negative|neutral\", \
\"objection\": \"price|timing|competition|authority|interest|information|none\", \
\"interest_level\": \"hot|warm|cold\", \"summary\": \"one sentence\"}";

/// Derived analytics for one call transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAnalysis {
    pub sentiment: String,
    pub objection: String,
    pub interest_level: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct LlmAnalysis {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    objection: Option<String>,
    #[serde(default)]
    interest_level: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Derives sentiment, objection, interest level and a summary from a
/// transcript. The LLM path is used when configured; any failure there
/// falls back to deterministic keyword scoring, so analysis itself never
/// errors.
pub struct TranscriptAnalyzer {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    model: String,
}

impl TranscriptAnalyzer {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build analyzer HTTP client")?;
        Ok(Self {
            client,
            api_url: config.llm_api_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    pub async fn analyze(&self, transcript: &str, duration: i32, converted: bool) -> CallAnalysis {
        if let Some(api_url) = &self.api_url {
            match self
                .analyze_with_llm(api_url, transcript, duration, converted)
                .await
            {
                Ok(analysis) => return analysis,
                Err(err) => {
                    warn!(error = %err, "LLM analysis failed, using keyword fallback");
                }
            }
        }

        fallback_analysis(transcript, duration, converted)
    }

    async fn analyze_with_llm(
        &self,
        api_url: &str,
        transcript: &str,
        duration: i32,
        converted: bool,
    ) -> Result<CallAnalysis> {
        let user_message = format!(
            "Duration: {duration}s\nMeeting booked: {converted}\nTranscript:\n{transcript}"
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": LLM_INSTRUCTION },
                { "role": "user", "content": user_message },
            ],
            "temperature": 0,
        });

        let mut builder = self.client.post(api_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.context("LLM request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("LLM endpoint returned {status}"));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("LLM response was not valid JSON")?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| anyhow!("LLM response had no choices"))?;

        let parsed: LlmAnalysis = serde_json::from_str(strip_code_fences(content))
            .context("LLM content did not match the requested JSON shape")?;

        // Missing fields default to the fallback's answer for that field.
        let defaults = fallback_analysis(transcript, duration, converted);
        Ok(CallAnalysis {
            sentiment: parsed.sentiment.unwrap_or(defaults.sentiment),
            objection: parsed.objection.unwrap_or(defaults.objection),
            interest_level: parsed.interest_level.unwrap_or(defaults.interest_level),
            summary: parsed.summary.unwrap_or(defaults.summary),
        })
    }
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

const POSITIVE_PHRASES: &[&str] = &[
    "interested",
    "sounds good",
    "great",
    "perfect",
    "definitely",
    "absolutely",
    "sure",
    "let's do it",
    "send me",
];

const NEGATIVE_PHRASES: &[&str] = &[
    "not interested",
    "no thanks",
    "stop calling",
    "don't call",
    "remove me",
    "hang up",
    "waste of time",
    "not a fit",
];

const OBJECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("price", &["price", "cost", "expensive", "budget"]),
    ("timing", &["timing", "not a good time", "next quarter", "call back later"]),
    ("competition", &["competitor", "already use", "another vendor", "existing provider"]),
];

/// Deterministic keyword scoring used when the LLM path fails or is not
/// configured. Lexicons are empirical and intentionally small.
pub fn fallback_analysis(transcript: &str, duration: i32, converted: bool) -> CallAnalysis {
    let mut text = transcript.to_lowercase();

    // Strip negative phrases as they are counted so "not interested" never
    // also scores as "interested".
    let mut score: i32 = 0;
    for phrase in NEGATIVE_PHRASES {
        while let Some(pos) = text.find(phrase) {
            score -= 1;
            text.replace_range(pos..pos + phrase.len(), " ");
        }
    }
    for phrase in POSITIVE_PHRASES {
        score += text.matches(phrase).count() as i32;
    }

    if duration > 120 {
        score += 1;
    } else if duration < 30 {
        score -= 1;
    }

    let sentiment = if score > 0 {
        SENTIMENT_POSITIVE
    } else if score < 0 {
        SENTIMENT_NEGATIVE
    } else {
        SENTIMENT_NEUTRAL
    };

    let objection = OBJECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(OBJECTION_NONE);

    let interest_level = if converted {
        INTEREST_HOT
    } else if duration > 120 && sentiment == SENTIMENT_POSITIVE {
        INTEREST_WARM
    } else {
        INTEREST_COLD
    };

    CallAnalysis {
        sentiment: sentiment.to_string(),
        objection: objection.to_string(),
        interest_level: interest_level.to_string(),
        summary: format!(
            "Keyword analysis of a {duration}s call: sentiment {sentiment}, objection {objection}."
        ),
    }
}
