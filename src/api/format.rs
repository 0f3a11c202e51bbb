//! Response Formatter
//!
//! Turns per-model outcomes into the analyze response: an HTML display
//! string, the predicted label and a rendered top-3 list for every model.

use crate::engine::RankedClass;
use crate::service::{AnalyzeResult, ModelOutcome};

use super::dto::{AnalyzeResponse, ModelErrorDto, ModelPredictionDto};

/// Label shown for a model that produced no prediction
pub const UNAVAILABLE: &str = "unavailable";

pub fn build_analyze_response(result: &AnalyzeResult) -> AnalyzeResponse {
    let count = result.outcomes.len();
    let mut response = AnalyzeResponse {
        text_result: Vec::with_capacity(count),
        result: Vec::with_capacity(count),
        top_3_result: Vec::with_capacity(count),
        errors: Vec::new(),
    };

    for outcome in &result.outcomes {
        let name = outcome.model_name().to_string();
        match outcome {
            ModelOutcome::Success(p) => {
                let label = &p.prediction.predicted_label;
                response.text_result.push(text_result(&name, label, "pred"));
                response.result.push(ModelPredictionDto {
                    model_name: name.clone(),
                    prediction: label.clone(),
                });
                response.top_3_result.push(ModelPredictionDto {
                    model_name: name,
                    prediction: render_ranked(&p.top3),
                });
            }
            ModelOutcome::Failed { error, .. } => {
                response.text_result.push(text_result(&name, UNAVAILABLE, "pred unavailable"));
                response.result.push(ModelPredictionDto {
                    model_name: name.clone(),
                    prediction: UNAVAILABLE.to_string(),
                });
                response.top_3_result.push(ModelPredictionDto {
                    model_name: name.clone(),
                    prediction: "[]".to_string(),
                });
                response.errors.push(ModelErrorDto {
                    model_name: name,
                    error: error.clone(),
                });
            }
        }
    }

    response
}

/// HTML summary line for one model
pub fn text_result(model_name: &str, label: &str, css_class: &str) -> String {
    format!(
        "<strong>model name:</strong> {},<br /><strong>prediction:</strong> <span class='{}'>{}</span><br />",
        model_name, css_class, label
    )
}

/// Render a ranking as a list of `(label, score)` tuples,
/// e.g. `[('dog', 0.98), ('cat', 0.02)]`
pub fn render_ranked(ranked: &[RankedClass]) -> String {
    let items: Vec<String> = ranked
        .iter()
        .map(|r| format!("({}, {})", quote_label(&r.label), render_score(r.score)))
        .collect();
    format!("[{}]", items.join(", "))
}

/// Shortest round-trip rendering of the score widened to f64
fn render_score(score: f32) -> String {
    let value = f64::from(score);
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:?}", value)
    }
}

/// Single-quote a label, switching to double quotes when the label holds a
/// single quote and no double quote
fn quote_label(label: &str) -> String {
    let quote = if label.contains('\'') && !label.contains('"') { '"' } else { '\'' };

    let mut out = String::with_capacity(label.len() + 2);
    out.push(quote);
    for ch in label.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
