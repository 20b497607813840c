//! Dataset loading, validation, and scope resolution.
//!
//! The dataset is a JSON export of the assessment store: cycles,
//! participants, respondents, categories, questions, and responses. This
//! module stands in for the SQL layer: it checks referential integrity,
//! joins responses to their question and category metadata, and selects the
//! rows a report covers.

use crate::models::{
    Category, Cycle, CycleStatus, Participant, Question, Respondent, Response, ResponseRow,
    TrainingCourse, SCALE_MAX, SCALE_MIN,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Referential or structural problems in a dataset export.
///
/// Every variant names the offending record so a bad export can be fixed
/// instead of silently corrupting report averages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("question {question_id} references unknown category {category_id}")]
    UnknownCategory {
        question_id: String,
        category_id: String,
    },

    #[error("response {response_id} references unknown question {question_id}")]
    UnknownQuestion {
        response_id: String,
        question_id: String,
    },

    #[error("response {response_id} references unknown respondent {respondent_id}")]
    UnknownRespondent {
        response_id: String,
        respondent_id: String,
    },

    #[error("respondent {respondent_id} references unknown participant {participant_id}")]
    UnknownParticipant {
        respondent_id: String,
        participant_id: String,
    },

    #[error("participant {participant_id} references unknown cycle {cycle_id}")]
    UnknownCycle {
        participant_id: String,
        cycle_id: String,
    },

    #[error("duplicate response for respondent {respondent_id} and question {question_id}")]
    DuplicateResponse {
        respondent_id: String,
        question_id: String,
    },

    #[error(
        "question {question_id} declares range {min}..={max}, outside the {scale_min}..={scale_max} reporting scale"
    )]
    BadQuestionRange {
        question_id: String,
        min: i32,
        max: i32,
        scale_min: i32,
        scale_max: i32,
    },

    #[error("no participation found for user {user_id}")]
    UserNotFound { user_id: String },

    #[error("cycle {cycle_id} does not exist in the dataset")]
    CycleNotFound { cycle_id: String },
}

/// The subset of responses a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// All respondents of one participant.
    Participant(String),
    /// All participants of one cycle.
    Cycle(String),
    /// Everything in the dataset.
    Organization,
}

/// Record counts shown by `--dry-run` and the organization report header.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetTotals {
    pub cycles: usize,
    pub active_cycles: usize,
    pub completed_cycles: usize,
    pub participants: usize,
    pub respondents: usize,
    pub categories: usize,
    pub questions: usize,
    pub responses: usize,
}

/// A full assessment dataset export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub cycles: Vec<Cycle>,
    pub participants: Vec<Participant>,
    pub respondents: Vec<Respondent>,
    pub categories: Vec<Category>,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
    pub courses: Vec<TrainingCourse>,
}

impl Dataset {
    /// Load a dataset export from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset file: {}", path.display()))?;

        info!(
            "Loaded dataset: {} responses across {} cycles",
            dataset.responses.len(),
            dataset.cycles.len()
        );

        Ok(dataset)
    }

    /// Check referential integrity and structural rules.
    ///
    /// Runs before any aggregation; a report is never computed from an
    /// export that fails here.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let cycle_ids: HashSet<&str> = self.cycles.iter().map(|c| c.id.as_str()).collect();
        let category_ids: HashSet<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();
        let participant_ids: HashSet<&str> =
            self.participants.iter().map(|p| p.id.as_str()).collect();
        let question_ids: HashSet<&str> = self.questions.iter().map(|q| q.id.as_str()).collect();
        let respondent_ids: HashSet<&str> =
            self.respondents.iter().map(|r| r.id.as_str()).collect();

        for question in &self.questions {
            if !category_ids.contains(question.category_id.as_str()) {
                return Err(DatasetError::UnknownCategory {
                    question_id: question.id.clone(),
                    category_id: question.category_id.clone(),
                });
            }
            if question.min_value > question.max_value
                || question.min_value < SCALE_MIN
                || question.max_value > SCALE_MAX
            {
                return Err(DatasetError::BadQuestionRange {
                    question_id: question.id.clone(),
                    min: question.min_value,
                    max: question.max_value,
                    scale_min: SCALE_MIN,
                    scale_max: SCALE_MAX,
                });
            }
        }

        for participant in &self.participants {
            if !cycle_ids.contains(participant.cycle_id.as_str()) {
                return Err(DatasetError::UnknownCycle {
                    participant_id: participant.id.clone(),
                    cycle_id: participant.cycle_id.clone(),
                });
            }
        }

        for respondent in &self.respondents {
            if !participant_ids.contains(respondent.participant_id.as_str()) {
                return Err(DatasetError::UnknownParticipant {
                    respondent_id: respondent.id.clone(),
                    participant_id: respondent.participant_id.clone(),
                });
            }
        }

        let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();
        for response in &self.responses {
            if !respondent_ids.contains(response.respondent_id.as_str()) {
                return Err(DatasetError::UnknownRespondent {
                    response_id: response.id.clone(),
                    respondent_id: response.respondent_id.clone(),
                });
            }
            if !question_ids.contains(response.question_id.as_str()) {
                return Err(DatasetError::UnknownQuestion {
                    response_id: response.id.clone(),
                    question_id: response.question_id.clone(),
                });
            }
            if !seen_pairs.insert((
                response.respondent_id.as_str(),
                response.question_id.as_str(),
            )) {
                return Err(DatasetError::DuplicateResponse {
                    respondent_id: response.respondent_id.clone(),
                    question_id: response.question_id.clone(),
                });
            }
        }

        debug!("Dataset integrity checks passed");
        Ok(())
    }

    /// Record counts for the dry-run listing and report headers.
    pub fn totals(&self) -> DatasetTotals {
        DatasetTotals {
            cycles: self.cycles.len(),
            active_cycles: self
                .cycles
                .iter()
                .filter(|c| c.status == CycleStatus::Active)
                .count(),
            completed_cycles: self
                .cycles
                .iter()
                .filter(|c| c.status == CycleStatus::Completed)
                .count(),
            participants: self.participants.len(),
            respondents: self.respondents.len(),
            categories: self.categories.len(),
            questions: self.questions.len(),
            responses: self.responses.len(),
        }
    }

    /// Look up a cycle by id.
    pub fn cycle(&self, cycle_id: &str) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id == cycle_id)
    }

    /// Find the participant record a user's report should cover.
    ///
    /// With a cycle given, only that cycle's participation counts; `None`
    /// means the user simply was not assessed in it (an empty report, not
    /// an error). Without one, the most recently completed cycle wins, then
    /// the most recent participation of any status.
    pub fn resolve_participant(
        &self,
        user_id: &str,
        cycle_id: Option<&str>,
    ) -> Result<Option<&Participant>, DatasetError> {
        if let Some(cid) = cycle_id {
            if self.cycle(cid).is_none() {
                return Err(DatasetError::CycleNotFound {
                    cycle_id: cid.to_string(),
                });
            }
        }

        let mine: Vec<&Participant> = self
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .collect();

        if mine.is_empty() {
            return Err(DatasetError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }

        if let Some(cid) = cycle_id {
            return Ok(mine.into_iter().find(|p| p.cycle_id == cid));
        }

        let with_cycles: Vec<(&Participant, &Cycle)> = mine
            .into_iter()
            .filter_map(|p| self.cycle(&p.cycle_id).map(|c| (p, c)))
            .collect();

        let latest_completed = with_cycles
            .iter()
            .filter(|(_, c)| c.status == CycleStatus::Completed)
            .max_by_key(|(_, c)| (c.end_date, c.id.as_str()));
        if let Some((participant, _)) = latest_completed {
            return Ok(Some(*participant));
        }

        Ok(with_cycles
            .iter()
            .max_by_key(|(_, c)| (c.start_date, c.id.as_str()))
            .map(|(participant, _)| *participant))
    }

    /// The user's participations in completed cycles, end date ascending.
    pub fn completed_participations(&self, user_id: &str) -> Vec<(&Participant, &Cycle)> {
        let mut participations: Vec<(&Participant, &Cycle)> = self
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| self.cycle(&p.cycle_id).map(|c| (p, c)))
            .filter(|(_, c)| c.status == CycleStatus::Completed)
            .collect();

        participations.sort_by(|a, b| {
            a.1.end_date
                .cmp(&b.1.end_date)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        participations
    }

    /// Join the responses in scope to their question, category, and
    /// respondent metadata.
    ///
    /// Rows come out in dataset file order; the engine does not care, and
    /// keeping the order stable makes repeated runs byte-identical.
    pub fn rows_in_scope(&self, scope: &Scope) -> Result<Vec<ResponseRow>, DatasetError> {
        if let Scope::Cycle(cycle_id) = scope {
            if self.cycle(cycle_id).is_none() {
                return Err(DatasetError::CycleNotFound {
                    cycle_id: cycle_id.clone(),
                });
            }
        }

        let categories: HashMap<&str, &Category> =
            self.categories.iter().map(|c| (c.id.as_str(), c)).collect();
        let questions: HashMap<&str, &Question> =
            self.questions.iter().map(|q| (q.id.as_str(), q)).collect();
        let participants: HashMap<&str, &Participant> = self
            .participants
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect();
        let respondents: HashMap<&str, &Respondent> = self
            .respondents
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        let mut rows = Vec::new();

        for response in &self.responses {
            let respondent = respondents.get(response.respondent_id.as_str()).ok_or_else(
                || DatasetError::UnknownRespondent {
                    response_id: response.id.clone(),
                    respondent_id: response.respondent_id.clone(),
                },
            )?;
            let participant = participants
                .get(respondent.participant_id.as_str())
                .ok_or_else(|| DatasetError::UnknownParticipant {
                    respondent_id: respondent.id.clone(),
                    participant_id: respondent.participant_id.clone(),
                })?;

            let in_scope = match scope {
                Scope::Organization => true,
                Scope::Cycle(cycle_id) => participant.cycle_id == *cycle_id,
                Scope::Participant(participant_id) => participant.id == *participant_id,
            };
            if !in_scope {
                continue;
            }

            let question = questions.get(response.question_id.as_str()).ok_or_else(|| {
                DatasetError::UnknownQuestion {
                    response_id: response.id.clone(),
                    question_id: response.question_id.clone(),
                }
            })?;
            let category = categories.get(question.category_id.as_str()).ok_or_else(|| {
                DatasetError::UnknownCategory {
                    question_id: question.id.clone(),
                    category_id: question.category_id.clone(),
                }
            })?;

            rows.push(ResponseRow {
                response_id: response.id.clone(),
                respondent_id: respondent.id.clone(),
                respondent_role: respondent.role,
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                question_kind: question.kind,
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                category_color: category.color.clone(),
                category_sort_order: category.sort_order,
                min_value: question.min_value,
                max_value: question.max_value,
                rating_value: response.rating_value,
                text_response: response.text_response.clone(),
                boolean_response: response.boolean_response,
                comment: response.comment.clone(),
            });
        }

        debug!("Joined {} rows for scope {:?}", rows.len(), scope);
        Ok(rows)
    }

    /// Courses offered to employees right now.
    pub fn active_courses(&self) -> Vec<&TrainingCourse> {
        self.courses.iter().filter(|c| c.is_active).collect()
    }
}
