//! One capture, from OCR output to a record ready for the store.
//!
//! A [`CaptureContext`] is created when a scan begins and consumed by
//! [`CaptureContext::resolve`]. The only suspension point is the operator
//! prompt for ambiguous or codeless captures; every non-record outcome is a
//! [`CaptureError`] and leaves nothing behind.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::disambiguate::{disambiguate, Disambiguation, Operator, Selection};
use crate::error::CaptureError;
use crate::extract::extract_codes;
use crate::model::{
    Category, Code, Confidence, RawRecord, ResolutionSource, UserId, VehicleResolution,
};
use crate::prefix::{enrich, resolve_code, PrefixSource};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Structured guess returned by the OCR collaborator. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrGuess {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub eurocode: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl OcrGuess {
    /// Parse the JSON object returned by the OCR collaborator.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrInput {
    pub raw_text: String,
    pub guess: Option<OcrGuess>,
}

impl OcrInput {
    pub fn text(raw_text: impl Into<String>) -> Self {
        Self { raw_text: raw_text.into(), guess: None }
    }

    pub fn with_guess(mut self, guess: OcrGuess) -> Self {
        self.guess = Some(guess);
        self
    }
}

/// Whether a capture without a code may be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodelessPolicy {
    /// Persist only after the operator explicitly confirms.
    #[default]
    Confirm,
    /// Never persist a codeless record.
    Reject,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CaptureContext {
    captured_by: UserId,
    location: Option<String>,
    input: OcrInput,
    started_at: DateTime<Utc>,
}

/// A record ready to append, plus how its vehicle was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureOutcome {
    pub record: RawRecord,
    pub resolution: VehicleResolution,
}

impl CaptureContext {
    pub fn begin(captured_by: UserId, location: Option<String>, input: OcrInput) -> Self {
        Self {
            captured_by,
            location: location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            input,
            started_at: Utc::now(),
        }
    }

    /// Override the capture timestamp (imports, tests).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.started_at = timestamp;
        self
    }

    /// Candidates from the guess's code field, then its text, then the raw
    /// text, deduplicated in that order.
    pub fn candidates(&self) -> Vec<Code> {
        let mut sources: Vec<&str> = Vec::new();
        if let Some(guess) = &self.input.guess {
            sources.extend(guess.eurocode.as_deref());
            sources.extend(guess.text.as_deref());
        }
        sources.push(&self.input.raw_text);

        let mut seen = HashSet::new();
        sources
            .into_iter()
            .flat_map(extract_codes)
            .filter(|code| seen.insert(code.clone()))
            .collect()
    }

    /// Drive the capture to a terminal outcome. Consumes the context.
    pub fn resolve<S, O>(
        self,
        source: &S,
        operator: &mut O,
        policy: CodelessPolicy,
    ) -> Result<CaptureOutcome, CaptureError>
    where
        S: PrefixSource + ?Sized,
        O: Operator + ?Sized,
    {
        let candidates = self.candidates();
        let code = match disambiguate(candidates) {
            Disambiguation::Selected(code) => Some(code),
            Disambiguation::NoCodeFound => {
                if policy == CodelessPolicy::Reject
                    || !operator.confirm_codeless(&self.raw_text())
                {
                    tracing::info!(user = %self.captured_by, "capture discarded: no code found");
                    return Err(CaptureError::NoCodeFound);
                }
                None
            }
            Disambiguation::Ambiguous(candidates) => match operator.select(&candidates) {
                Selection::Selected(code) => {
                    if !candidates.contains(&code) {
                        return Err(CaptureError::InvalidSelection(code.into_string()));
                    }
                    Some(code)
                }
                Selection::Declined => {
                    if policy == CodelessPolicy::Reject {
                        return Err(CaptureError::Declined);
                    }
                    None
                }
                Selection::Cancelled => {
                    tracing::info!(user = %self.captured_by, "capture cancelled by operator");
                    return Err(CaptureError::Cancelled);
                }
            },
        };

        Ok(self.finish(code, source))
    }

    fn raw_text(&self) -> String {
        if !self.input.raw_text.trim().is_empty() {
            return self.input.raw_text.clone();
        }
        self.input
            .guess
            .as_ref()
            .and_then(|g| g.text.clone())
            .unwrap_or_default()
    }

    fn seed(&self) -> VehicleResolution {
        let clean = |v: &Option<String>| {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        };
        match &self.input.guess {
            Some(guess) if clean(&guess.brand).is_some() || clean(&guess.model).is_some() => {
                VehicleResolution {
                    brand: clean(&guess.brand),
                    model: clean(&guess.model),
                    confidence: Confidence::Unknown,
                    source: ResolutionSource::OcrFreeText,
                }
            }
            _ => VehicleResolution::unknown(),
        }
    }

    fn finish<S: PrefixSource + ?Sized>(self, code: Option<Code>, source: &S) -> CaptureOutcome {
        let seed = self.seed();
        let resolution = match &code {
            Some(code) => match resolve_code(source, code) {
                Ok(resolved) => enrich(seed, resolved),
                Err(e) => {
                    tracing::warn!(error = %e, "prefix lookup failed; vehicle left unresolved");
                    seed
                }
            },
            None => seed,
        };
        let category = code
            .as_ref()
            .map(|c| classify(c.as_str()))
            .unwrap_or(Category::Standard);

        let record = RawRecord {
            id: None,
            raw_text: self.raw_text(),
            code: code.map(Code::into_string),
            vehicle_brand: resolution.brand.clone(),
            vehicle_model: resolution.model.clone(),
            captured_at: self.started_at,
            location: self.location,
            captured_by: self.captured_by,
            category,
        };
        tracing::debug!(
            code = record.code.as_deref().unwrap_or("-"),
            category = %record.category,
            confidence = ?resolution.confidence,
            "capture resolved"
        );
        CaptureOutcome { record, resolution }
    }
}
