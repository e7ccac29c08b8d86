use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use transcript_store::{CorrectionRule, SourceString};

use crate::error::RouteError;

use super::session::{require_session_and_language, LanguageQuery};
use super::AppState;

#[derive(Deserialize)]
pub struct SourceStringWire {
    pub string: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct CorrectionRuleEntry {
    pub source_strings: Vec<SourceStringWire>,
    pub to: String,
    /// Carried over from the original wire shape; the store does not track
    /// a client-supplied rule version, so this is accepted and ignored.
    #[serde(default)]
    pub version: Option<u32>,
}

#[derive(Deserialize)]
pub struct SubmitCorrectionRulesBody {
    pub entries: Vec<CorrectionRuleEntry>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl From<CorrectionRuleEntry> for CorrectionRule {
    fn from(entry: CorrectionRuleEntry) -> Self {
        CorrectionRule {
            sources: entry
                .source_strings
                .into_iter()
                .map(|s| SourceString {
                    text: s.string,
                    active: s.active,
                })
                .collect(),
            replacement: entry.to,
        }
    }
}

pub async fn submit_correction_rules(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
    Json(body): Json<SubmitCorrectionRulesBody>,
) -> Result<Json<MessageResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;
    let rules: Vec<CorrectionRule> = body.entries.into_iter().map(Into::into).collect();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.submit_correction_rules(session_id, language, rules)?;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Successfully uploaded rules for session {session_id}, language {language}"),
    }))
}

#[derive(Serialize)]
pub struct CorrectionRuleEntryWire {
    pub source_strings: Vec<SourceStringWireOut>,
    pub to: String,
}

#[derive(Serialize)]
pub struct SourceStringWireOut {
    pub string: String,
    pub active: bool,
}

#[derive(Serialize)]
pub struct GetCorrectionRulesResponse {
    pub locked: bool,
    pub entries: Vec<CorrectionRuleEntryWire>,
}

pub async fn get_correction_rules(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<GetCorrectionRulesResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;

    let dispatcher = state.lock().expect("dispatcher lock poisoned");
    let entries = dispatcher
        .get_correction_rules(session_id, language)?
        .into_iter()
        .map(|rule| CorrectionRuleEntryWire {
            source_strings: rule
                .sources
                .into_iter()
                .map(|s| SourceStringWireOut {
                    string: s.text,
                    active: s.active,
                })
                .collect(),
            to: rule.replacement,
        })
        .collect();

    Ok(Json(GetCorrectionRulesResponse {
        locked: true,
        entries,
    }))
}
