//! Submission data model: the wire-shaped input and its normalized form.
//!
//! ## Why two shapes?
//!
//! The intake form posts a *flat* JSON object whose keys are only partially
//! self-describing: scalar answers sit next to an index-suffixed repeated
//! group (`familyLastName1`, `familyAge2`, …) standing in for a list of
//! family members. [`RawSubmission`] is that wire shape, untyped beyond
//! "string-like". [`NormalizedSubmission`] is the canonical in-memory shape
//! every downstream stage (record mapping, document markup) consumes: named
//! scalar fields plus an ordered `Vec<FamilyMember>`. Normalizing once at the
//! boundary means the index-suffix convention exists in exactly one place.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::IntakeError;

/// The flat, string-keyed form submission as received over the wire.
///
/// Values are strings or arrays of strings (checkbox groups). Anything else
/// is tolerated and read as empty — the form is the validator of record;
/// the pipeline only defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawSubmission(Map<String, Value>);

impl RawSubmission {
    /// Parse a request body into a `RawSubmission`.
    ///
    /// Fails only when the body is not a JSON object at all; individual
    /// fields are never validated here.
    pub fn from_json_str(body: &str) -> Result<Self, IntakeError> {
        serde_json::from_str(body).map_err(|e| IntakeError::InvalidBody {
            detail: e.to_string(),
        })
    }

    /// Build a submission from an existing JSON object map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Read a scalar field, defaulting to the empty string.
    ///
    /// Numbers and booleans are stringified the way a template would
    /// interpolate them; arrays and objects read as empty.
    pub fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Read a field that may arrive as either a string or an array of
    /// strings (checkbox groups), preserving which one it was.
    pub fn multi(&self, key: &str) -> MultiValue {
        match self.0.get(key) {
            Some(Value::Array(items)) => MultiValue::List(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Some(Value::String(s)) => MultiValue::Text(s.clone()),
            _ => MultiValue::Text(String::new()),
        }
    }

    /// Whether `key` is present with a non-empty string value.
    ///
    /// This is the termination predicate for the family-group scan.
    pub fn has_text(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::String(s)) if !s.is_empty())
    }
}

/// A field that may have been submitted as a single string or as a list.
///
/// The record mapper and the document renderer both project a list to a
/// `", "`-joined string; keeping the original shape until projection lets
/// them share one rule instead of each re-guessing the wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiValue {
    /// Submitted as a plain string (or absent).
    Text(String),
    /// Submitted as an array of strings.
    List(Vec<String>),
}

impl MultiValue {
    /// Project to a single string: lists join with `", "` in original
    /// order, plain text passes through unchanged.
    ///
    /// Note the projection is lossy — `"A, B"` and `["A", "B"]` become
    /// indistinguishable, matching the remote schema which stores one cell.
    pub fn joined(&self) -> String {
        match self {
            MultiValue::Text(s) => s.clone(),
            MultiValue::List(items) => items.join(", "),
        }
    }
}

impl Default for MultiValue {
    fn default() -> Self {
        MultiValue::Text(String::new())
    }
}

/// One member of the applicant's household.
///
/// Identity is purely positional — a member exists only as row *i* of its
/// parent submission's family table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyMember {
    pub last_name: String,
    pub first_name: String,
    pub last_name_kana: String,
    pub first_name_kana: String,
    pub relationship: String,
    pub age: String,
    pub occupation: String,
}

/// The canonical, typed shape of one intake submission.
///
/// Every scalar defaults to the empty string; the family sequence preserves
/// the original 1-based index order. Produced once per request by
/// [`crate::pipeline::normalize::normalize`] and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSubmission {
    // ── Applicant identity / contact / address ───────────────────────────
    pub last_name: String,
    pub first_name: String,
    pub last_name_kana: String,
    pub first_name_kana: String,
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub address: String,
    pub building: String,
    pub phone: String,
    pub email: String,

    // ── Migration intent ─────────────────────────────────────────────────
    pub immigrant_count: String,
    pub applicant_age: String,
    pub applicant_occupation: String,
    pub birth_prefecture: String,
    pub birth_city: String,
    pub desired_time: String,
    pub reason: String,
    pub plans: String,
    pub employment_type: String,
    pub consultation: String,
    pub mail_permission: String,

    // ── Vacant-house-bank preferences ────────────────────────────────────
    pub usage_purpose: String,
    pub property_number: String,
    pub area: MultiValue,
    pub transaction_type: String,
    pub layout: String,
    pub parking_spaces: String,
    pub has_pet: String,
    pub pet_type: String,
    pub pet_count: String,
    pub pet_location: String,
    pub other_conditions: String,

    // ── Survey answers ───────────────────────────────────────────────────
    pub priority: MultiValue,
    pub location: String,
    pub water: String,
    pub building_type: String,
    pub floors: String,
    pub onsen: String,
    pub garden: String,
    pub survey_other: String,
    pub school_size: String,

    /// Household members, in original 1-based index order, gapless.
    pub family: Vec<FamilyMember>,
}

impl NormalizedSubmission {
    /// Applicant display name, `姓 名` with a single separating space.
    pub fn applicant_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}
