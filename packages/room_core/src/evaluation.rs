//! Partial evaluation updates.
//!
//! An [`EvaluationFragment`] is the validated form of `evaluationData`: every
//! key is a known field and every value has that field's type.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::RoomError;
use crate::protocol::{Interview, InterviewStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Score,
    Text,
    Status,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvaluationField {
    Status,
    EndTime,
    Feedback,
    OverallScore,
    TechnicalSkillScore,
    ProblemSolvingScore,
    CommunicationScore,
    AttitudeScore,
    ExperienceRelevanceScore,
    StrengthsNotes,
    ImprovementAreasNotes,
    TechnicalFeedback,
    CulturalFitNotes,
    RecommendationNotes,
}

impl EvaluationField {
    pub const ALL: [EvaluationField; 14] = [
        Self::Status,
        Self::EndTime,
        Self::Feedback,
        Self::OverallScore,
        Self::TechnicalSkillScore,
        Self::ProblemSolvingScore,
        Self::CommunicationScore,
        Self::AttitudeScore,
        Self::ExperienceRelevanceScore,
        Self::StrengthsNotes,
        Self::ImprovementAreasNotes,
        Self::TechnicalFeedback,
        Self::CulturalFitNotes,
        Self::RecommendationNotes,
    ];

    /// Name as it appears in `evaluationData`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::EndTime => "endTime",
            Self::Feedback => "feedback",
            Self::OverallScore => "overallScore",
            Self::TechnicalSkillScore => "technicalSkillScore",
            Self::ProblemSolvingScore => "problemSolvingScore",
            Self::CommunicationScore => "communicationScore",
            Self::AttitudeScore => "attitudeScore",
            Self::ExperienceRelevanceScore => "experienceRelevanceScore",
            Self::StrengthsNotes => "strengthsNotes",
            Self::ImprovementAreasNotes => "improvementAreasNotes",
            Self::TechnicalFeedback => "technicalFeedback",
            Self::CulturalFitNotes => "culturalFitNotes",
            Self::RecommendationNotes => "recommendationNotes",
        }
    }

    /// Storage column name.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::EndTime => "end_time",
            Self::Feedback => "feedback",
            Self::OverallScore => "overall_score",
            Self::TechnicalSkillScore => "technical_skill_score",
            Self::ProblemSolvingScore => "problem_solving_score",
            Self::CommunicationScore => "communication_score",
            Self::AttitudeScore => "attitude_score",
            Self::ExperienceRelevanceScore => "experience_relevance_score",
            Self::StrengthsNotes => "strengths_notes",
            Self::ImprovementAreasNotes => "improvement_areas_notes",
            Self::TechnicalFeedback => "technical_feedback",
            Self::CulturalFitNotes => "cultural_fit_notes",
            Self::RecommendationNotes => "recommendation_notes",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Status => FieldKind::Status,
            Self::EndTime => FieldKind::Timestamp,
            Self::OverallScore
            | Self::TechnicalSkillScore
            | Self::ProblemSolvingScore
            | Self::CommunicationScore
            | Self::AttitudeScore
            | Self::ExperienceRelevanceScore => FieldKind::Score,
            Self::Feedback
            | Self::StrengthsNotes
            | Self::ImprovementAreasNotes
            | Self::TechnicalFeedback
            | Self::CulturalFitNotes
            | Self::RecommendationNotes => FieldKind::Text,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// A typed value for one field. `None` clears the field; status cannot be cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Score(Option<f64>),
    Text(Option<String>),
    Status(InterviewStatus),
    Timestamp(Option<DateTime<Utc>>),
}

impl FieldValue {
    fn parse(field: EvaluationField, value: &Value) -> Result<Self, RoomError> {
        let name = field.name();
        match field.kind() {
            FieldKind::Score => match value {
                Value::Null => Ok(Self::Score(None)),
                Value::Number(n) => n.as_f64().map(|v| Self::Score(Some(v))).ok_or_else(|| {
                    RoomError::validation(format!("{} is not a finite number", name))
                }),
                _ => Err(RoomError::validation(format!(
                    "{} must be a number or null",
                    name
                ))),
            },
            FieldKind::Text => match value {
                Value::Null => Ok(Self::Text(None)),
                Value::String(s) => Ok(Self::Text(Some(s.clone()))),
                _ => Err(RoomError::validation(format!(
                    "{} must be a string or null",
                    name
                ))),
            },
            FieldKind::Status => match value {
                Value::String(s) => Ok(Self::Status(s.parse()?)),
                _ => Err(RoomError::validation(
                    "status must be one of ACTIVE, COMPLETED, CANCELLED, PENDING_REVIEW",
                )),
            },
            FieldKind::Timestamp => match value {
                Value::Null => Ok(Self::Timestamp(None)),
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Self::Timestamp(Some(dt.with_timezone(&Utc))))
                    .map_err(|_| {
                        RoomError::validation(format!("{} must be an RFC 3339 timestamp", name))
                    }),
                _ => Err(RoomError::validation(format!(
                    "{} must be a timestamp string or null",
                    name
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationFragment {
    fields: BTreeMap<EvaluationField, FieldValue>,
}

impl EvaluationFragment {
    /// Validate raw `evaluationData`. Rejects the whole fragment on the first
    /// unknown name or mistyped value.
    pub fn from_json(data: &Map<String, Value>) -> Result<Self, RoomError> {
        let mut fields = BTreeMap::new();
        for (name, value) in data {
            let field = EvaluationField::from_name(name).ok_or_else(|| {
                RoomError::validation(format!("unknown evaluation field: {}", name))
            })?;
            fields.insert(field, FieldValue::parse(field, value)?);
        }
        Ok(Self { fields })
    }

    pub fn set(&mut self, field: EvaluationField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: EvaluationField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EvaluationField, &FieldValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Last-write-wins merge into an interview record.
    pub fn apply_to(&self, interview: &mut Interview, now: DateTime<Utc>) {
        for (field, value) in &self.fields {
            match (field, value) {
                (EvaluationField::Status, FieldValue::Status(s)) => interview.status = *s,
                (EvaluationField::EndTime, FieldValue::Timestamp(t)) => interview.end_time = *t,
                (f, FieldValue::Score(v)) => {
                    if let Some(slot) = score_slot(interview, *f) {
                        *slot = *v;
                    }
                }
                (f, FieldValue::Text(v)) => {
                    if let Some(slot) = text_slot(interview, *f) {
                        *slot = v.clone();
                    }
                }
                _ => {}
            }
        }
        interview.updated_at = now;
    }
}

fn score_slot(interview: &mut Interview, field: EvaluationField) -> Option<&mut Option<f64>> {
    match field {
        EvaluationField::OverallScore => Some(&mut interview.overall_score),
        EvaluationField::TechnicalSkillScore => Some(&mut interview.technical_skill_score),
        EvaluationField::ProblemSolvingScore => Some(&mut interview.problem_solving_score),
        EvaluationField::CommunicationScore => Some(&mut interview.communication_score),
        EvaluationField::AttitudeScore => Some(&mut interview.attitude_score),
        EvaluationField::ExperienceRelevanceScore => {
            Some(&mut interview.experience_relevance_score)
        }
        _ => None,
    }
}

fn text_slot(interview: &mut Interview, field: EvaluationField) -> Option<&mut Option<String>> {
    match field {
        EvaluationField::Feedback => Some(&mut interview.feedback),
        EvaluationField::StrengthsNotes => Some(&mut interview.strengths_notes),
        EvaluationField::ImprovementAreasNotes => Some(&mut interview.improvement_areas_notes),
        EvaluationField::TechnicalFeedback => Some(&mut interview.technical_feedback),
        EvaluationField::CulturalFitNotes => Some(&mut interview.cultural_fit_notes),
        EvaluationField::RecommendationNotes => Some(&mut interview.recommendation_notes),
        _ => None,
    }
}
