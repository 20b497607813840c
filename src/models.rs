//! Data models for the feedback analytics engine.
//!
//! This module contains the dataset entities (cycles, participants,
//! respondents, categories, questions, responses), the joined response row
//! fed to the aggregation engine, and the report structures the engine
//! produces.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Version of the serialized report shape. Bump on any field change.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Lower bound of the reporting scale.
pub const SCALE_MIN: i32 = 1;
/// Upper bound of the reporting scale.
pub const SCALE_MAX: i32 = 5;

/// Kind of a questionnaire question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Numeric rating on the question's declared scale
    Rating,
    /// Free-form text answer
    Text,
    /// Yes/no answer
    Boolean,
}

impl Default for QuestionKind {
    fn default() -> Self {
        QuestionKind::Rating
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Rating => write!(f, "rating"),
            QuestionKind::Text => write!(f, "text"),
            QuestionKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// Relationship of a respondent to the participant they assess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondentRole {
    /// The participant assessing themselves
    #[serde(rename = "self")]
    SelfReview,
    Peer,
    Manager,
    Subordinate,
}

impl RespondentRole {
    /// Human-readable label used in report output.
    pub fn label(&self) -> &'static str {
        match self {
            RespondentRole::SelfReview => "self-assessment",
            RespondentRole::Peer => "peer",
            RespondentRole::Manager => "manager",
            RespondentRole::Subordinate => "subordinate",
        }
    }
}

impl fmt::Display for RespondentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lifecycle status of an assessment cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Draft,
    Active,
    Completed,
}

impl Default for CycleStatus {
    fn default() -> Self {
        CycleStatus::Draft
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleStatus::Draft => write!(f, "draft"),
            CycleStatus::Active => write!(f, "active"),
            CycleStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A time-boxed feedback exercise covering one or more participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: CycleStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// The employee being evaluated within one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub cycle_id: String,
    pub user_id: String,
    pub user_name: String,
}

/// A person providing answers about one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Respondent {
    pub id: String,
    pub participant_id: String,
    pub role: RespondentRole,
}

/// A competency grouping of questions (e.g. "Leadership").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_color() -> String {
    "#3B82F6".to_string()
}

/// A single questionnaire question, belonging to exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub category_id: String,
    pub text: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(default = "default_min_value")]
    pub min_value: i32,
    #[serde(default = "default_max_value")]
    pub max_value: i32,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_min_value() -> i32 {
    SCALE_MIN
}

fn default_max_value() -> i32 {
    SCALE_MAX
}

/// One respondent's answer to one question.
///
/// At most one response exists per (respondent, question) pair; the dataset
/// layer rejects duplicates before any aggregation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub respondent_id: String,
    pub question_id: String,
    #[serde(default)]
    pub rating_value: Option<i32>,
    #[serde(default)]
    pub text_response: Option<String>,
    #[serde(default)]
    pub boolean_response: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A training course offered to employees; feeds the recommendation prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingCourse {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A response joined to its question, category, and respondent metadata.
///
/// This is the flat record the aggregation engine consumes; the dataset
/// layer produces it and guarantees referential integrity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRow {
    pub response_id: String,
    pub respondent_id: String,
    pub respondent_role: RespondentRole,
    pub question_id: String,
    pub question_text: String,
    pub question_kind: QuestionKind,
    pub category_id: String,
    pub category_name: String,
    pub category_color: String,
    pub category_sort_order: i32,
    pub min_value: i32,
    pub max_value: i32,
    pub rating_value: Option<i32>,
    pub text_response: Option<String>,
    pub boolean_response: Option<bool>,
    pub comment: Option<String>,
}

/// Count of rating responses per scale value, keys 1..=5.
///
/// Values absent from the input map to 0 rather than being omitted.
pub type Distribution = BTreeMap<i32, u64>;

/// A distribution with every scale value present and zeroed.
pub fn zeroed_distribution() -> Distribution {
    (SCALE_MIN..=SCALE_MAX).map(|v| (v, 0)).collect()
}

/// Aggregated statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Arithmetic mean of the category's rating responses, 2 decimals.
    pub average: f64,
    /// Number of rating responses in the category.
    pub count: u64,
    pub distribution: Distribution,
}

/// A category entry in the strengths/weaknesses rankings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCategory {
    pub id: String,
    pub name: String,
    pub color: String,
    pub average: f64,
}

impl From<&CategoryAverage> for RankedCategory {
    fn from(ca: &CategoryAverage) -> Self {
        Self {
            id: ca.id.clone(),
            name: ca.name.clone(),
            color: ca.color.clone(),
            average: ca.average,
        }
    }
}

/// Top and bottom categories by average score. Never overlapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rankings {
    pub strengths: Vec<RankedCategory>,
    pub weaknesses: Vec<RankedCategory>,
}

/// The aggregated score statistics for one report scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub schema_version: u32,
    /// Mean of the category averages; every category weighs equally.
    pub overall_average: f64,
    pub category_averages: Vec<CategoryAverage>,
    pub strengths: Vec<RankedCategory>,
    pub weaknesses: Vec<RankedCategory>,
    /// Every response in scope, including text and boolean answers.
    pub total_responses: u64,
    /// Rating counts across all categories.
    pub response_distribution: Distribution,
}

impl ScoreSummary {
    /// The well-defined "no data yet" summary.
    pub fn empty() -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            overall_average: 0.0,
            category_averages: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            total_responses: 0,
            response_distribution: zeroed_distribution(),
        }
    }
}

/// Overall score of one completed cycle, input to trend computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleScore {
    pub cycle_id: String,
    pub cycle_name: String,
    pub end_date: NaiveDate,
    pub overall_average: f64,
}

/// One point of the score-over-time chart data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub score: f64,
}

/// A free-text answer or comment, attributed by role only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    pub category_name: String,
    pub question_text: String,
    pub respondent_role: RespondentRole,
    pub text: String,
}

/// What a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    Participant,
    Cycle,
    Organization,
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportScope::Participant => write!(f, "participant"),
            ReportScope::Cycle => write!(f, "cycle"),
            ReportScope::Organization => write!(f, "organization"),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    /// Path of the dataset export the report was computed from.
    pub dataset: String,
    pub scope: ReportScope,
    /// Name of the assessed employee, for participant-scoped reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<String>,
    /// Distinct respondents contributing to the scope.
    pub respondents: u64,
    /// Model used for recommendations, when any were generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub tool_version: String,
}

/// The complete report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ScoreSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trend: Vec<TrendPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

/// Malformed input detected during aggregation.
///
/// Bad records are never clamped or dropped; a single offending response
/// fails the whole computation so averages cannot be silently skewed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "rating {value} on response {response_id} is outside the declared range {min}..={max}"
    )]
    RatingOutOfRange {
        response_id: String,
        value: i32,
        min: i32,
        max: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respondent_role_serde() {
        let json = serde_json::to_string(&RespondentRole::SelfReview).unwrap();
        assert_eq!(json, "\"self\"");
        let role: RespondentRole = serde_json::from_str("\"peer\"").unwrap();
        assert_eq!(role, RespondentRole::Peer);
    }

    #[test]
    fn test_question_defaults() {
        let q: Question = serde_json::from_str(
            r#"{"id":"q1","categoryId":"c1","text":"Communicates clearly"}"#,
        )
        .unwrap();
        assert_eq!(q.kind, QuestionKind::Rating);
        assert_eq!(q.min_value, 1);
        assert_eq!(q.max_value, 5);
        assert_eq!(q.sort_order, 0);
    }

    #[test]
    fn test_zeroed_distribution_covers_scale() {
        let dist = zeroed_distribution();
        assert_eq!(dist.len(), 5);
        assert!(dist.values().all(|&v| v == 0));
        assert_eq!(dist.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_summary_shape() {
        let summary = ScoreSummary::empty();
        assert_eq!(summary.overall_average, 0.0);
        assert!(summary.category_averages.is_empty());
        assert!(summary.strengths.is_empty());
        assert!(summary.weaknesses.is_empty());
        assert_eq!(summary.total_responses, 0);
        assert_eq!(summary.response_distribution, zeroed_distribution());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_string(&ScoreSummary::empty()).unwrap();
        assert!(json.contains("\"overallAverage\""));
        assert!(json.contains("\"categoryAverages\""));
        assert!(json.contains("\"responseDistribution\""));
        assert!(json.contains("\"schemaVersion\":1"));
        // distribution keys are the scale values
        assert!(json.contains("\"1\":0"));
        assert!(json.contains("\"5\":0"));
    }

    #[test]
    fn test_validation_error_names_the_response() {
        let err = ValidationError::RatingOutOfRange {
            response_id: "r-42".to_string(),
            value: 9,
            min: 1,
            max: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("r-42"));
        assert!(msg.contains('9'));
        assert!(msg.contains("1..=5"));
    }
}
