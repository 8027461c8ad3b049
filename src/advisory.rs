//! Wellness analysis backed by a generative-language API.
//!
//! The model is asked to answer with JSON matching [`AnalysisResult`]; the
//! schema is sent along with the prompt so the reply can be decoded directly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AdvisoryConfig;
use crate::error::{AppError, Result};
use crate::models::CycleRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRisk {
    pub condition: String,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YogaPose {
    pub name: String,
    pub benefit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessPlan {
    pub diet_chart: Vec<Meal>,
    pub yoga_poses: Vec<YogaPose>,
    pub food_habits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_health_score: f64,
    pub summary: String,
    pub risks: Vec<HealthRisk>,
    pub wellness_plan: WellnessPlan,
    pub disclaimer: String,
}

pub struct AdvisoryClient {
    http: reqwest::Client,
    config: AdvisoryConfig,
}

impl AdvisoryClient {
    pub fn new(http: reqwest::Client, config: AdvisoryConfig) -> Self {
        Self { http, config }
    }

    pub async fn analyze(
        &self,
        records: &[CycleRecord],
        age: i32,
        location: Option<&str>,
    ) -> Result<AnalysisResult> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            AppError::AdvisoryUnavailable("GEMINI_API_KEY is not set".into())
        })?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(records, age, location) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        tracing::info!("🤖 Requesting wellness analysis for {} records", records.len());

        let reply: Value = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_reply(&reply)
    }
}

/// One line of history per record, followed by age and location context.
pub fn build_prompt(records: &[CycleRecord], age: i32, location: Option<&str>) -> String {
    let history = records
        .iter()
        .map(|r| {
            format!(
                "Cycle: {} days, Duration: {} days, Flow: {}, Pain: {}, Symptoms: {}",
                r.cycle_length,
                r.duration,
                r.flow_intensity,
                r.pain_level,
                r.symptoms.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let location_context = match location.map(str::trim).filter(|l| !l.is_empty()) {
        Some(place) => format!(
            "The user is located in or near: {place}. Please ensure the diet recommendations \
             (ingredients, meals) are locally available, culturally appropriate, and relevant \
             to this region."
        ),
        None => String::new(),
    };

    format!(
        "Analyze the following menstrual health data for a {age}-year-old female and detect \
         potential health risks.\n\
         Crucially, provide a personalized wellness plan including specific food habits, a daily \
         diet chart (Breakfast, Lunch, Dinner, Snacks), and specific Yoga poses suited for their \
         symptoms.\n\n\
         {location_context}\n\n\
         Current Data:\n\
         {history}"
    )
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallHealthScore": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
            "risks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "condition": { "type": "STRING" },
                        "riskLevel": { "type": "STRING", "enum": ["Low", "Moderate", "High"] },
                        "reasoning": { "type": "STRING" },
                        "recommendations": string_list(),
                    },
                    "required": ["condition", "riskLevel", "reasoning", "recommendations"],
                },
            },
            "wellnessPlan": {
                "type": "OBJECT",
                "properties": {
                    "dietChart": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "meal": { "type": "STRING" },
                                "recommendation": { "type": "STRING" },
                            },
                            "required": ["meal", "recommendation"],
                        },
                    },
                    "yogaPoses": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "benefit": { "type": "STRING" },
                            },
                            "required": ["name", "benefit"],
                        },
                    },
                    "foodHabits": string_list(),
                },
                "required": ["dietChart", "yogaPoses", "foodHabits"],
            },
            "disclaimer": { "type": "STRING" },
        },
        "required": ["overallHealthScore", "summary", "risks", "wellnessPlan", "disclaimer"],
    })
}

/// Pull the first candidate's text out of a `generateContent` reply and decode it.
pub fn parse_reply(reply: &Value) -> Result<AnalysisResult> {
    let text = reply
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::UpstreamResponse("Empty response from AI".into()))?;

    serde_json::from_str(text)
        .map_err(|e| AppError::UpstreamResponse(format!("Malformed analysis: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowIntensity, NewCycleRecord, PainLevel};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn sample_record() -> CycleRecord {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        NewCycleRecord {
            start_date: start,
            end_date: start,
            duration: 5,
            cycle_length: 29,
            flow_intensity: FlowIntensity::Heavy,
            pain_level: PainLevel::High,
            symptoms: vec!["Cramps".into(), "Fatigue".into()],
            is_missed: false,
            is_pregnant: false,
            notes: String::new(),
        }
        .into_record(Uuid::new_v4(), Uuid::nil(), Utc::now())
    }

    const SAMPLE_ANALYSIS: &str = r#"{
        "overallHealthScore": 72,
        "summary": "Mostly regular cycles.",
        "risks": [{
            "condition": "Dysmenorrhea",
            "riskLevel": "Moderate",
            "reasoning": "High pain reported.",
            "recommendations": ["Heat therapy"]
        }],
        "wellnessPlan": {
            "dietChart": [{ "meal": "Breakfast", "recommendation": "Oats" }],
            "yogaPoses": [{ "name": "Child's Pose", "benefit": "Relieves cramps" }],
            "foodHabits": ["Stay hydrated"]
        },
        "disclaimer": "Not medical advice."
    }"#;

    #[test]
    fn prompt_lists_each_record() {
        let prompt = build_prompt(&[sample_record()], 27, None);
        assert!(prompt.contains("27-year-old"));
        assert!(prompt.contains(
            "Cycle: 29 days, Duration: 5 days, Flow: Heavy, Pain: High, Symptoms: Cramps, Fatigue"
        ));
        assert!(!prompt.contains("located in or near"));
    }

    #[test]
    fn prompt_includes_location_context() {
        let prompt = build_prompt(&[], 30, Some("Kolkata"));
        assert!(prompt.contains("located in or near: Kolkata"));
    }

    #[test]
    fn parses_candidate_text() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": SAMPLE_ANALYSIS }] } }]
        });
        let analysis = parse_reply(&reply).unwrap();
        assert_eq!(analysis.overall_health_score, 72.0);
        assert_eq!(analysis.risks[0].risk_level, RiskLevel::Moderate);
        assert_eq!(analysis.wellness_plan.yoga_poses[0].name, "Child's Pose");
    }

    #[test]
    fn empty_reply_is_an_upstream_error() {
        let reply = json!({ "candidates": [] });
        assert!(matches!(parse_reply(&reply), Err(AppError::UpstreamResponse(_))));
    }

    #[test]
    fn malformed_analysis_is_an_upstream_error() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"summary\": 1}" }] } }]
        });
        assert!(matches!(parse_reply(&reply), Err(AppError::UpstreamResponse(_))));
    }

    #[test]
    fn schema_requires_top_level_fields() {
        let schema = response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let client = AdvisoryClient::new(
            reqwest::Client::new(),
            AdvisoryConfig {
                api_key: None,
                model: "m".into(),
                base_url: "http://127.0.0.1:9".into(),
            },
        );
        let err = client.analyze(&[], 30, None).await.unwrap_err();
        assert!(matches!(err, AppError::AdvisoryUnavailable(_)));
    }
}
