use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::guide::{self, InterviewGuide};

/// The stakeholder groups recruited by the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantType {
    Patient,
    Clinician,
    Herbalist,
    Caregiver,
    Policymaker,
    Researcher,
}

impl ParticipantType {
    pub const ALL: [ParticipantType; 6] = [
        ParticipantType::Patient,
        ParticipantType::Clinician,
        ParticipantType::Herbalist,
        ParticipantType::Caregiver,
        ParticipantType::Policymaker,
        ParticipantType::Researcher,
    ];

    /// Prefix used for participant IDs of this type.
    pub fn prefix(&self) -> &'static str {
        match self {
            ParticipantType::Patient => "PAT",
            ParticipantType::Clinician => "CLN",
            ParticipantType::Herbalist => "HRB",
            ParticipantType::Caregiver => "CG",
            ParticipantType::Policymaker => "POL",
            ParticipantType::Researcher => "RES",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Patient => "patient",
            ParticipantType::Clinician => "clinician",
            ParticipantType::Herbalist => "herbalist",
            ParticipantType::Caregiver => "caregiver",
            ParticipantType::Policymaker => "policymaker",
            ParticipantType::Researcher => "researcher",
        }
    }

    /// Capitalized name for display ("Patient", "Clinician", ...).
    pub fn display_name(&self) -> &'static str {
        match self {
            ParticipantType::Patient => "Patient",
            ParticipantType::Clinician => "Clinician",
            ParticipantType::Herbalist => "Herbalist",
            ParticipantType::Caregiver => "Caregiver",
            ParticipantType::Policymaker => "Policymaker",
            ParticipantType::Researcher => "Researcher",
        }
    }

    /// Build the ID for the `sequence`-th participant of this type.
    pub fn participant_id(&self, sequence: u32) -> String {
        format!("{}{:03}", self.prefix(), sequence)
    }

    /// Ordered eligibility criteria screened for this type.
    pub fn criteria(&self) -> &'static [&'static str] {
        match self {
            ParticipantType::Patient => &[
                "Aged 18 years or older",
                "Clinically diagnosed with hypertension (≥6 months)",
                "Currently using conventional and/or herbal treatments",
                "Owns or has regular access to a smartphone",
                "Willing to participate in digital N-of-1 trial",
                "Able to provide informed consent",
            ],
            ParticipantType::Clinician => &[
                "Aged 18 years or older",
                "Registered/licensed medical professional in Ghana",
                "≥6 months experience managing hypertensive patients",
                "Located in Eastern Region and currently practicing",
                "Comfortable with digital or mobile platforms",
                "Willing to participate in interviews/workshops",
                "Able to provide informed consent",
            ],
            ParticipantType::Herbalist => &[
                "Aged 18 years or older",
                "Identifies as a traditional/herbal practitioner",
                "≥6 months experience treating hypertension",
                "Located in Eastern Region and serving local clients",
                "Open to discussing treatment practices in research setting",
                "Willing to engage in co-design or interviews",
                "Able to provide informed consent",
            ],
            ParticipantType::Caregiver => &[
                "Aged 18 years or older",
                "Provides regular support to a person diagnosed with hypertension",
                "Has been involved in caregiving for ≥3 months",
                "Aware of the patient's treatment behaviours",
                "Located in Eastern Region and reachable for interview",
                "Comfortable speaking about caregiving experiences",
                "Able to provide informed consent",
            ],
            ParticipantType::Policymaker => &[
                "Aged 18 years or older",
                "Holds a relevant role in policy, regulation, or planning",
                "Currently active in Ghana's health or NCD-related sectors",
                "Familiar with digital health, innovation, or NCD policy",
                "Willing to participate in stakeholder dialogue",
                "Able to provide informed consent",
            ],
            ParticipantType::Researcher => &[
                "Aged 18 years or older",
                "Holds a degree in public health, social sciences, medicine, or related field",
                "Experience (≥6 months) conducting health-related research in Ghana",
                "Based in or actively conducting research in the Eastern Region",
                "Familiar with digital data collection or mobile platforms",
                "Willing to participate in interviews/workshops",
                "Able to provide informed consent",
            ],
        }
    }

    pub fn guide(&self) -> &'static InterviewGuide {
        guide::for_type(*self)
    }
}

impl fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown participant type: {0}")]
pub struct UnknownParticipantType(pub String);

impl FromStr for ParticipantType {
    type Err = UnknownParticipantType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ParticipantType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownParticipantType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl FromStr for Answer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            other => Err(format!("Expected yes or no, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionAnswer {
    pub question: String,
    pub answer: Answer,
}

/// True iff at least one criterion was answered and every answer is yes.
pub fn is_eligible(answers: &[CriterionAnswer]) -> bool {
    !answers.is_empty() && answers.iter().all(|a| a.answer == Answer::Yes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(rename = "type")]
    pub participant_type: ParticipantType,
    #[serde(default)]
    pub study_site: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub age_range: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub preferred_contact: String,
    #[serde(default)]
    pub eligibility_criteria: Vec<CriterionAnswer>,
    pub is_eligible: bool,
    pub date_screened: DateTime<Utc>,
    #[serde(default)]
    pub interview_completed: bool,
}

/// Screening form input for a new participant.
///
/// `answers` is positional against [`ParticipantType::criteria`]; `None`
/// marks a criterion left unanswered.
#[derive(Debug, Clone, Default)]
pub struct Screening {
    pub participant_type: Option<ParticipantType>,
    pub study_site: String,
    pub full_name: String,
    pub age_range: String,
    pub gender: String,
    pub contact_number: String,
    pub preferred_contact: String,
    pub answers: Vec<Option<Answer>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid screening: {}", .0.join(", "))]
pub struct ValidationError(pub Vec<String>);

impl Screening {
    /// Check the required screening fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        if self.full_name.trim().is_empty() {
            errors.push("Full name is required".to_string());
        }
        if self.participant_type.is_none() {
            errors.push("Participant type is required".to_string());
        }
        if self.age_range.trim().is_empty() {
            errors.push("Age range is required".to_string());
        }
        if self.gender.trim().is_empty() {
            errors.push("Gender is required".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(errors))
        }
    }

    /// Pair each answered criterion with its question text.
    pub fn criterion_answers(&self, participant_type: ParticipantType) -> Vec<CriterionAnswer> {
        participant_type
            .criteria()
            .iter()
            .zip(&self.answers)
            .filter_map(|(question, answer)| {
                answer.map(|answer| CriterionAnswer {
                    question: question.to_string(),
                    answer,
                })
            })
            .collect()
    }
}
