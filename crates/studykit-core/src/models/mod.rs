//! Data models for the study.
//!
//! - `Participant`, `ParticipantType`, `Screening`: screening and eligibility
//! - `Interview`, `InterviewKind`: interview records
//! - `AudioRecording`: session-only audio references
//! - `PersistedDataset`: the unit written to the persistence store
//! - `InterviewGuide`: per-type interview prompts

pub mod dataset;
pub mod guide;
pub mod interview;
pub mod participant;
pub mod recording;

pub use dataset::PersistedDataset;
pub use guide::{GuideSection, InterviewGuide};
pub use interview::{interview_id, Interview, InterviewKind};
pub use participant::{
    is_eligible, Answer, CriterionAnswer, Participant, ParticipantType, Screening,
    UnknownParticipantType, ValidationError,
};
pub use recording::{recording_id, AudioRecording};
