//! Health insight generation
//!
//! Wraps a [`TextGenerator`] with the prompts used by the AI routes. Provider
//! failures never surface as HTTP errors: every operation returns a JSON
//! payload, and a failed call yields a degraded payload carrying `error`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use super::text_generation::{message, CompletionRequest, GenerationError, TextGenerator};
use crate::models::{ChatMessage, HealthLog, User};

/// Logs beyond this count are not sent to the provider
pub const MAX_ANALYZED_LOGS: usize = 30;
/// Trailing conversation messages forwarded with a chat turn
pub const CHAT_HISTORY_WINDOW: usize = 5;
pub const INSIGHTS_UNAVAILABLE: &str = "unavailable";

const ANALYST_SYSTEM_PROMPT: &str =
    "You are a helpful health analysis assistant. Provide clear, actionable insights.";
const ADVICE_SYSTEM_PROMPT: &str =
    "You are a helpful medical information assistant. Provide general health advice.";
const ADVICE_DISCLAIMER: &str =
    "This is general information only. Consult a healthcare professional for medical advice.";
const CHAT_FALLBACK: &str = "I'm having trouble responding right now. Please try again.";
const NO_DATA_MESSAGE: &str =
    "No health data available for analysis. Start logging your daily health to get personalized insights.";

#[derive(Clone)]
pub struct InsightService {
    generator: Arc<dyn TextGenerator>,
    insight_model: String,
    chat_model: String,
}

impl InsightService {
    pub fn new(generator: Arc<dyn TextGenerator>, insight_model: impl Into<String>, chat_model: impl Into<String>) -> Self {
        Self {
            generator,
            insight_model: insight_model.into(),
            chat_model: chat_model.into(),
        }
    }

    pub fn insight_model(&self) -> &str {
        &self.insight_model
    }

    /// Trend, correlation, recommendation and alert analysis over `logs`
    pub async fn analyze_trends(&self, user: &User, logs: &[HealthLog]) -> Value {
        if logs.is_empty() {
            return json!({
                "insights": NO_DATA_MESSAGE,
                "recommendations": [],
                "correlations": [],
            });
        }

        let analyzed = logs.get(..MAX_ANALYZED_LOGS).unwrap_or(logs);
        let prompt = trend_prompt(user, analyzed);
        let request = CompletionRequest::new(&self.insight_model, ANALYST_SYSTEM_PROMPT, &prompt)
            .temperature(0.7)
            .max_tokens(800);

        match self.generator.complete(request).await {
            Ok(text) => {
                let mut payload = json!({
                    "insights": text,
                    "data_points_analyzed": analyzed.len(),
                    "analysis_date": Utc::now(),
                });
                if let Some(structured) = parse_structured(&text) {
                    payload["structured"] = structured;
                }
                payload
            }
            Err(e) => degraded("AI analysis failed", &e),
        }
    }

    pub async fn symptom_advice(&self, symptom: &str, severity: &str) -> Value {
        let prompt = format!(
            "A patient is experiencing {symptom} with {severity} severity.\n\n\
             Provide:\n\
             1. Possible causes (3-4 common ones)\n\
             2. Home remedies and self-care tips\n\
             3. When to see a doctor (red flags)\n\
             4. Prevention tips\n\n\
             Keep it concise and practical. Format as JSON with keys: \
             \"causes\", \"remedies\", \"when_to_see_doctor\", \"prevention\""
        );
        let request = CompletionRequest::new(&self.chat_model, ADVICE_SYSTEM_PROMPT, &prompt)
            .temperature(0.7)
            .max_tokens(500);

        match self.generator.complete(request).await {
            Ok(advice) => json!({
                "symptom": symptom,
                "severity": severity,
                "advice": advice,
                "disclaimer": ADVICE_DISCLAIMER,
            }),
            Err(e) => degraded("Failed to get advice", &e),
        }
    }

    pub async fn chat(&self, user: &User, text: &str, history: &[ChatMessage]) -> Value {
        let system = format!(
            "You are a friendly health assistant helping {}. \
             Provide helpful health information, answer questions about symptoms, \
             healthy lifestyle, and general wellness. Always remind users to consult \
             healthcare professionals for medical decisions. Be empathetic and supportive.",
            user.full_name
        );

        let window = history
            .get(history.len().saturating_sub(CHAT_HISTORY_WINDOW)..)
            .unwrap_or_default();
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(message("system", &system));
        messages.extend(window.iter().cloned());
        messages.push(message("user", text));

        let request = CompletionRequest {
            model: self.chat_model.clone(),
            messages,
            temperature: 0.8,
            max_tokens: 300,
        };

        match self.generator.complete(request).await {
            Ok(reply) => json!({
                "response": reply,
                "timestamp": Utc::now(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Chat completion failed");
                json!({
                    "error": format!("Chat failed: {e}"),
                    "response": CHAT_FALLBACK,
                })
            }
        }
    }
}

fn degraded(context: &str, error: &GenerationError) -> Value {
    tracing::warn!(error = %error, "{context}");
    json!({
        "error": format!("{context}: {error}"),
        "insights": INSIGHTS_UNAVAILABLE,
    })
}

fn or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn trend_prompt(user: &User, logs: &[HealthLog]) -> String {
    format!(
        "You are a health analyst AI. Analyze the following health data and provide insights.\n\n\
         Patient Information:\n\
         - Name: {name}\n\
         - Blood Group: {blood}\n\
         - Allergies: {allergies}\n\
         - Chronic Conditions: {conditions}\n\n\
         Health Logs Summary (Last {count} entries):\n\
         {summary}\n\n\
         Please provide:\n\
         1. Key health trends observed\n\
         2. Correlations between symptoms and lifestyle factors (e.g., sleep and headaches)\n\
         3. 3-5 actionable health recommendations\n\
         4. Any concerning patterns that need medical attention\n\n\
         Format your response as JSON with keys: \"trends\", \"correlations\", \"recommendations\", \"alerts\"",
        name = user.full_name,
        blood = user.blood_group.as_deref().unwrap_or("Not specified"),
        allergies = or_none(&user.allergies),
        conditions = or_none(&user.chronic_conditions),
        count = logs.len(),
        summary = log_summary(logs),
    )
}

/// One line per log: `Day n (YYYY-MM-DD): Temp, Sleep, Mood, Symptoms`
pub fn log_summary(logs: &[HealthLog]) -> String {
    logs.iter()
        .take(MAX_ANALYZED_LOGS)
        .enumerate()
        .map(|(i, log)| {
            let mut details = Vec::new();
            if let Some(temperature) = log.temperature {
                details.push(format!("Temp: {temperature}°C"));
            }
            if let Some(hours) = log.sleep_hours {
                details.push(format!("Sleep: {hours}hrs"));
            }
            details.push(format!("Mood: {}", log.mood.as_str()));

            let symptoms = log.active_symptoms();
            if !symptoms.is_empty() {
                details.push(format!("Symptoms: {}", symptoms.join(", ")));
            }

            format!("Day {} ({}): {}", i + 1, log.log_date.format("%Y-%m-%d"), details.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Models often wrap JSON in a fenced block
fn parse_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<Value>(body.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Sleep averages over logs that carry sleep data
pub fn sleep_analysis(logs: &[HealthLog]) -> Value {
    let nights: Vec<(f64, i32)> = logs
        .iter()
        .filter_map(|log| log.sleep_hours.map(|hours| (hours, log.sleep_quality)))
        .collect();

    if nights.is_empty() {
        return json!({ "message": "No sleep data available" });
    }

    let count = nights.len() as f64;
    let avg_sleep = nights.iter().map(|(hours, _)| hours).sum::<f64>() / count;
    let avg_quality = nights.iter().map(|(_, quality)| f64::from(*quality)).sum::<f64>() / count;

    let recommendation = if avg_sleep < 7.0 {
        "Adults should aim for 7-9 hours of quality sleep per night."
    } else {
        "Your sleep duration looks good!"
    };

    json!({
        "average_sleep_hours": round1(avg_sleep),
        "average_sleep_quality": round1(avg_quality),
        "total_nights_tracked": nights.len(),
        "recommendation": recommendation,
        "insights": format!(
            "You're averaging {avg_sleep:.1} hours of sleep with a quality rating of {avg_quality:.1}/10."
        ),
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthLogCreate, Role};
    use crate::services::text_generation::MockTextGenerator;
    use uuid::Uuid;

    fn patient() -> User {
        User::new("jane@example.com".into(), "hash".into(), "Jane Doe".into(), None, Role::Patient)
    }

    fn log(owner: Uuid, sleep: Option<f64>, quality: i32) -> HealthLog {
        let create: HealthLogCreate = serde_json::from_value(json!({
            "temperature": 37.2,
            "has_headache": true,
            "sleep_hours": sleep,
            "sleep_quality": quality,
        }))
        .unwrap();
        create.into_log(owner)
    }

    fn service(mock: MockTextGenerator) -> InsightService {
        InsightService::new(Arc::new(mock), "gpt-4o-mini", "gpt-3.5-turbo")
    }

    #[tokio::test]
    async fn test_analysis_success_reports_data_points() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete()
            .withf(|req| req.model == "gpt-4o-mini" && req.max_tokens == 800)
            .times(1)
            .returning(|_| Ok(r#"```json
{"trends": "stable", "recommendations": ["Sleep more"]}
```"#
                .to_string()));

        let user = patient();
        let logs = vec![log(user.id, Some(6.0), 5), log(user.id, None, 5)];
        let result = service(mock).analyze_trends(&user, &logs).await;

        assert_eq!(result["data_points_analyzed"], 2);
        assert_eq!(result["structured"]["trends"], "stable");
        assert!(result.get("error").is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete().returning(|_| {
            Err(GenerationError::Provider {
                status: 503,
                body: "overloaded".into(),
            })
        });

        let user = patient();
        let result = service(mock).analyze_trends(&user, &[log(user.id, None, 5)]).await;

        assert_eq!(result["insights"], INSIGHTS_UNAVAILABLE);
        assert!(result["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_no_logs_skips_provider() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete().times(0);

        let result = service(mock).analyze_trends(&patient(), &[]).await;
        assert_eq!(result["recommendations"], json!([]));
    }

    #[tokio::test]
    async fn test_chat_forwards_last_five_messages() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete()
            .withf(|req| {
                // system + 5 history + current
                req.messages.len() == 7
                    && req.messages[1].content == "m3"
                    && req.messages[6].content == "How do I sleep better?"
            })
            .returning(|_| Ok("Keep a schedule.".into()));

        let history: Vec<ChatMessage> = (1..=7).map(|i| message("user", &format!("m{i}"))).collect();
        let result = service(mock).chat(&patient(), "How do I sleep better?", &history).await;

        assert_eq!(result["response"], "Keep a schedule.");
    }

    #[tokio::test]
    async fn test_chat_failure_uses_fallback() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete().returning(|_| Err(GenerationError::NotConfigured));

        let result = service(mock).chat(&patient(), "hi", &[]).await;
        assert_eq!(result["response"], CHAT_FALLBACK);
        assert!(result["error"].is_string());
    }

    #[tokio::test]
    async fn test_symptom_advice_has_disclaimer() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete()
            .withf(|req| req.model == "gpt-3.5-turbo" && req.max_tokens == 500)
            .returning(|_| Ok("Rest and hydrate.".into()));

        let result = service(mock).symptom_advice("headache", "mild").await;
        assert_eq!(result["symptom"], "headache");
        assert_eq!(result["disclaimer"], ADVICE_DISCLAIMER);
    }

    #[test]
    fn test_log_summary_lines() {
        let user = patient();
        let summary = log_summary(&[log(user.id, Some(7.5), 6)]);
        assert!(summary.starts_with("Day 1 ("));
        assert!(summary.contains("Temp: 37.2°C"));
        assert!(summary.contains("Sleep: 7.5hrs"));
        assert!(summary.contains("Symptoms: headache"));
    }

    #[test]
    fn test_sleep_analysis() {
        let user = patient();
        let logs = vec![log(user.id, Some(6.0), 4), log(user.id, Some(6.5), 6), log(user.id, None, 9)];
        let result = sleep_analysis(&logs);

        assert_eq!(result["total_nights_tracked"], 2);
        assert_eq!(result["average_sleep_hours"], 6.3);
        assert_eq!(result["average_sleep_quality"], 5.0);
        assert_eq!(
            result["recommendation"],
            "Adults should aim for 7-9 hours of quality sleep per night."
        );

        assert_eq!(sleep_analysis(&[])["message"], "No sleep data available");
    }
}
