//! Prediction requester.
//!
//! Turns one event into a prompt, forces the model to answer through the
//! `submit_match_prediction` tool, and accepts the answer only if every
//! field of [`PredictionResult`] is present and well-formed. Anything else
//! is a `MalformedAiOutput`; there is no partial extraction and no retry.

use chrono::{Datelike, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::llm::{LlmClient, LlmReply, ToolSpec};
use crate::types::{Event, PredictionResult};

pub const PREDICTION_TOOL: &str = "submit_match_prediction";

pub struct Predictor {
    llm: Arc<dyn LlmClient>,
}

impl Predictor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn system_prompt() -> &'static str {
        "You are an expert sports analyst. You study team form, player \
         availability and matchups, and you commit to a single, calibrated \
         prediction. You always deliver your analysis by calling the \
         provided tool; never answer in plain text."
    }

    /// Build the user prompt for one match.
    ///
    /// `year` anchors the model on the current season.
    pub fn build_prompt(event: &Event, year: i32) -> String {
        format!(
            "Analyse the upcoming match between {home} (home) and {away} (away), \
             scheduled for {kickoff}.\n\n\
             Base your analysis on the {year} season and the most recent \
             information you have. Consider:\n\
             - Recent form of both teams over their last games\n\
             - Injuries, suspensions and key player availability\n\
             - Head-to-head history\n\
             - Home advantage and travel\n\
             - Tactical and statistical matchups\n\n\
             Provide a short summary, between 3 and 5 key factors each with \
             its reasoning, and a final prediction: the winning team, your \
             confidence between 0.0 and 1.0, and the final score formatted as \
             \"N-N\" (home score first).\n\n\
             Return your answer by calling the `{tool}` tool.",
            home = event.home_team,
            away = event.away_team,
            kickoff = event.commence_time.format("%Y-%m-%d %H:%M UTC"),
            year = year,
            tool = PREDICTION_TOOL,
        )
    }

    /// The tool schema the model is forced to call.
    pub fn tool_spec() -> ToolSpec {
        ToolSpec {
            name: PREDICTION_TOOL.to_string(),
            description: "Submit the structured match analysis and prediction.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Two or three sentence overview of the matchup."
                    },
                    "key_factors": {
                        "type": "array",
                        "description": "Between 3 and 5 factors that decide the match.",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "factor": { "type": "string" },
                                "reasoning": { "type": "string" }
                            },
                            "required": ["factor", "reasoning"]
                        }
                    },
                    "prediction": {
                        "type": "object",
                        "properties": {
                            "winner": {
                                "type": "string",
                                "description": "Name of the team expected to win."
                            },
                            "confidence": {
                                "type": "number",
                                "minimum": 0.0,
                                "maximum": 1.0
                            },
                            "final_score": {
                                "type": "string",
                                "description": "Predicted score as \"N-N\", home first.",
                                "pattern": "^\\d+-\\d+$"
                            }
                        },
                        "required": ["winner", "confidence", "final_score"]
                    }
                },
                "required": ["summary", "key_factors", "prediction"]
            }),
        }
    }

    /// Request a prediction for `event`.
    pub async fn predict(&self, event: &Event) -> Result<PredictionResult> {
        let prompt = Self::build_prompt(event, Utc::now().year());
        let tool = Self::tool_spec();

        debug!(game_id = %event.id, "Requesting prediction");

        let reply = self
            .llm
            .generate_structured(Self::system_prompt(), &prompt, &tool)
            .await
            .map_err(|e| {
                warn!(game_id = %event.id, error = %e, "Language model call failed");
                AppError::ModelUnavailable(format!("{e:#}"))
            })?;

        let result = extract_prediction(reply).inspect_err(|e| {
            warn!(game_id = %event.id, error = %e, "Rejected model output");
        })?;

        info!(
            game_id = %event.id,
            winner = %result.prediction.winner,
            confidence = result.prediction.confidence,
            score = %result.prediction.final_score,
            "Prediction complete"
        );

        Ok(result)
    }
}

/// Validate a model reply into a [`PredictionResult`].
pub fn extract_prediction(reply: LlmReply) -> Result<PredictionResult> {
    let arguments = match reply {
        LlmReply::ToolCall { name, arguments } if name == PREDICTION_TOOL => arguments,
        LlmReply::ToolCall { name, .. } => {
            return Err(AppError::MalformedAiOutput(format!(
                "model called unexpected tool `{name}`"
            )));
        }
        LlmReply::Text(_) => {
            return Err(AppError::MalformedAiOutput(
                "model answered in free text instead of calling the prediction tool".to_string(),
            ));
        }
    };

    let result: PredictionResult = serde_json::from_value(arguments)
        .map_err(|e| AppError::MalformedAiOutput(format!("tool arguments rejected: {e}")))?;

    validate(&result).map_err(AppError::MalformedAiOutput)?;
    Ok(result)
}

fn validate(result: &PredictionResult) -> std::result::Result<(), String> {
    if result.summary.trim().is_empty() {
        return Err("summary is empty".to_string());
    }
    if result.key_factors.is_empty() {
        return Err("key_factors is empty".to_string());
    }
    if result
        .key_factors
        .iter()
        .any(|k| k.factor.trim().is_empty() || k.reasoning.trim().is_empty())
    {
        return Err("key_factors has a blank entry".to_string());
    }

    let p = &result.prediction;
    if p.winner.trim().is_empty() {
        return Err("prediction.winner is empty".to_string());
    }
    if !(0.0..=1.0).contains(&p.confidence) {
        return Err(format!("prediction.confidence {} outside 0.0-1.0", p.confidence));
    }
    if !is_score(&p.final_score) {
        return Err(format!("prediction.final_score `{}` is not N-N", p.final_score));
    }
    Ok(())
}

/// `"24-17"` style score.
fn is_score(s: &str) -> bool {
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    s.split_once('-')
        .map(|(home, away)| digits(home) && digits(away))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
