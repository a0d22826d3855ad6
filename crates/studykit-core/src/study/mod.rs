//! Study state container.
//!
//! `Study` owns the in-memory dataset for a session. It loads from the
//! [`LocalStore`] once and writes the whole dataset back after every
//! mutation. Each mutation is built on a copy and only swapped in after
//! the save succeeds, so a failed write leaves the session untouched.

pub mod dashboard;
pub mod filter;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::models::{
    interview_id, is_eligible, recording_id, AudioRecording, Interview, InterviewKind,
    Participant, ParticipantType, PersistedDataset, Screening,
};
use crate::store::{KeyValueStore, LocalStore, StoreError};

pub use dashboard::DashboardStats;
pub use filter::{EligibilityStatus, ParticipantFilter};

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Participant type is required")]
    MissingParticipantType,

    #[error("Please select a participant first")]
    MissingParticipant,

    #[error("{given} answers given but {participant_type} screening has {expected} criteria")]
    TooManyAnswers {
        participant_type: String,
        expected: usize,
        given: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Study<K, C = SystemClock> {
    store: LocalStore<K>,
    clock: C,
    data: PersistedDataset,
    recordings: Vec<AudioRecording>,
}

impl<K: KeyValueStore> Study<K, SystemClock> {
    pub fn open(store: LocalStore<K>) -> Self {
        Self::open_with_clock(store, SystemClock)
    }
}

impl<K: KeyValueStore, C: Clock> Study<K, C> {
    pub fn open_with_clock(store: LocalStore<K>, clock: C) -> Self {
        let data = store.load();
        info!(
            participants = data.participants.len(),
            interviews = data.interviews.len(),
            "Loaded study data"
        );
        Self {
            store,
            clock,
            data,
            recordings: Vec::new(),
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.data.participants
    }

    pub fn interviews(&self) -> &[Interview] {
        &self.data.interviews
    }

    /// Recordings from this session only.
    pub fn recordings(&self) -> &[AudioRecording] {
        &self.recordings
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.data.participant(id)
    }

    /// ID the next participant of this type would receive.
    pub fn next_participant_id(&self, participant_type: ParticipantType) -> String {
        participant_type.participant_id(self.data.next_sequence(participant_type))
    }

    /// Persist `next` and adopt it as the session dataset.
    fn commit(&mut self, mut next: PersistedDataset) -> Result<(), StudyError> {
        next.audio_count = self.recordings.len();
        self.store.save(&next)?;
        self.data = next;
        Ok(())
    }

    // ===== Screening =====

    /// Record a screened participant, eligible or not.
    pub fn screen_participant(&mut self, screening: Screening) -> Result<&Participant, StudyError> {
        let participant_type = screening
            .participant_type
            .ok_or(StudyError::MissingParticipantType)?;

        let expected = participant_type.criteria().len();
        if screening.answers.len() > expected {
            return Err(StudyError::TooManyAnswers {
                participant_type: participant_type.to_string(),
                expected,
                given: screening.answers.len(),
            });
        }

        let mut next = self.data.clone();
        let sequence = next.next_sequence(participant_type);
        let eligibility_criteria = screening.criterion_answers(participant_type);
        let participant = Participant {
            id: participant_type.participant_id(sequence),
            participant_type,
            study_site: screening.study_site,
            full_name: screening.full_name,
            age_range: screening.age_range,
            gender: screening.gender,
            contact_number: screening.contact_number,
            preferred_contact: screening.preferred_contact,
            is_eligible: is_eligible(&eligibility_criteria),
            eligibility_criteria,
            date_screened: self.clock.now(),
            interview_completed: false,
        };
        info!(id = %participant.id, eligible = participant.is_eligible, "Screened participant");

        next.counters.insert(participant_type, sequence);
        next.participants.push(participant);
        self.commit(next)?;

        let index = self.data.participants.len() - 1;
        Ok(&self.data.participants[index])
    }

    /// Participants who can be selected for an interview.
    pub fn eligible_participants(&self) -> impl Iterator<Item = &Participant> {
        self.data.participants.iter().filter(|p| p.is_eligible)
    }

    pub fn filter_participants(&self, filter: &ParticipantFilter) -> Vec<&Participant> {
        self.data
            .participants
            .iter()
            .filter(|p| filter.matches(p))
            .collect()
    }

    pub fn dashboard(&self) -> DashboardStats {
        DashboardStats::compute(&self.data.participants, &self.recordings)
    }

    // ===== Interviews =====

    fn new_interview(&self, participant_id: &str, kind: InterviewKind, notes: &str) -> Interview {
        let timestamp = self.clock.now();
        let id = unique_id(timestamp, interview_id, |id| {
            self.data.interviews.iter().any(|i| i.id == id)
        });
        Interview {
            id,
            participant_id: participant_id.to_string(),
            kind,
            notes: notes.to_string(),
            timestamp,
            completed: false,
        }
    }

    /// Save interview notes as a new, not yet completed, interview.
    pub fn save_interview(
        &mut self,
        participant_id: &str,
        kind: InterviewKind,
        notes: &str,
    ) -> Result<&Interview, StudyError> {
        if participant_id.trim().is_empty() {
            return Err(StudyError::MissingParticipant);
        }

        let interview = self.new_interview(participant_id, kind, notes);
        debug!(id = %interview.id, participant = participant_id, "Saving interview");

        let mut next = self.data.clone();
        next.interviews.push(interview);
        self.commit(next)?;

        let index = self.data.interviews.len() - 1;
        Ok(&self.data.interviews[index])
    }

    /// Save the final notes and mark the interview complete.
    ///
    /// Appending the interview, flagging the participant, and flagging the
    /// participant's latest interview all land in a single save.
    pub fn complete_interview(
        &mut self,
        participant_id: &str,
        kind: InterviewKind,
        notes: &str,
    ) -> Result<&Interview, StudyError> {
        if participant_id.trim().is_empty() {
            return Err(StudyError::MissingParticipant);
        }

        let mut next = self.data.clone();
        next.interviews
            .push(self.new_interview(participant_id, kind, notes));

        if let Some(participant) = next.participant_mut(participant_id) {
            participant.interview_completed = true;
        } else {
            debug!(participant = participant_id, "Completing interview for unknown participant");
        }

        let latest = next.latest_interview_index(participant_id);
        if let Some(index) = latest {
            next.interviews[index].completed = true;
        }

        self.commit(next)?;
        info!(participant = participant_id, "Interview completed");

        let index = latest.unwrap_or(self.data.interviews.len() - 1);
        Ok(&self.data.interviews[index])
    }

    // ===== Drafts =====

    pub fn save_draft(&self, participant_id: &str, text: &str) -> Result<(), StudyError> {
        Ok(self.store.save_draft(participant_id, text)?)
    }

    pub fn load_draft(&self, participant_id: &str) -> Result<Option<String>, StudyError> {
        Ok(self.store.load_draft(participant_id)?)
    }

    // ===== Audio =====

    /// Register audio handed over by the host capture API.
    pub fn add_recording(
        &mut self,
        participant_id: &str,
        kind: InterviewKind,
        blob: impl Into<Arc<[u8]>>,
    ) -> Result<&AudioRecording, StudyError> {
        let timestamp = self.clock.now();
        let id = unique_id(timestamp, recording_id, |id| {
            self.recordings.iter().any(|r| r.id == id)
        });
        let recording = AudioRecording {
            locator: format!("blob:{}", id),
            id,
            participant_id: participant_id.to_string(),
            kind,
            blob: blob.into(),
            timestamp,
            duration_secs: 0.0,
        };

        let mut next = self.data.clone();
        next.audio_count = self.recordings.len() + 1;
        self.store.save(&next)?;

        self.recordings.push(recording);
        self.data = next;
        let index = self.recordings.len() - 1;
        Ok(&self.recordings[index])
    }

    // ===== Reset =====

    /// Delete the stored dataset and reset the session. Drafts are kept.
    pub fn clear_all(&mut self) -> Result<(), StudyError> {
        self.store.clear_all()?;
        self.data = PersistedDataset::default();
        self.recordings.clear();
        info!("Cleared all study data");
        Ok(())
    }
}

/// Timestamp-derived ID that is not yet taken, stepping forward one
/// millisecond at a time on collision.
fn unique_id(
    at: DateTime<Utc>,
    make: impl Fn(DateTime<Utc>) -> String,
    taken: impl Fn(&str) -> bool,
) -> String {
    let mut at = at;
    loop {
        let id = make(at);
        if !taken(&id) {
            return id;
        }
        at += Duration::milliseconds(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;
    use crate::store::{MemoryStore, DATASET_KEY};
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Clock pinned to a settable instant.
    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(millis: i64) -> Self {
            Self(Mutex::new(Utc.timestamp_millis_opt(millis).unwrap()))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn screening(t: ParticipantType, name: &str, answers: &[Answer]) -> Screening {
        Screening {
            participant_type: Some(t),
            full_name: name.to_string(),
            age_range: "30-39".to_string(),
            gender: "female".to_string(),
            answers: answers.iter().copied().map(Some).collect(),
            ..Default::default()
        }
    }

    fn study() -> Study<Arc<MemoryStore>, FixedClock> {
        let backend = Arc::new(MemoryStore::new());
        Study::open_with_clock(LocalStore::new(backend), FixedClock::at(1_700_000_000_000))
    }

    #[test]
    fn test_screening_scenario_pat001_pat002() {
        let mut study = study();
        let all_yes = vec![Answer::Yes; ParticipantType::Patient.criteria().len()];

        let first = study
            .screen_participant(screening(ParticipantType::Patient, "Ama", &all_yes))
            .unwrap();
        assert_eq!(first.id, "PAT001");
        assert!(first.is_eligible);
        assert_eq!(first.eligibility_criteria.len(), 6);

        let mut one_no = all_yes.clone();
        one_no[2] = Answer::No;
        let second = study
            .screen_participant(screening(ParticipantType::Patient, "Yaw", &one_no))
            .unwrap();
        assert_eq!(second.id, "PAT002");
        assert!(!second.is_eligible);

        let clinician = study
            .screen_participant(screening(ParticipantType::Clinician, "Dr. Asante", &[Answer::Yes]))
            .unwrap();
        assert_eq!(clinician.id, "CLN001");
        assert_eq!(study.next_participant_id(ParticipantType::Patient), "PAT003");
    }

    #[test]
    fn test_no_answers_is_not_eligible() {
        let mut study = study();
        let p = study
            .screen_participant(screening(ParticipantType::Researcher, "Efua", &[]))
            .unwrap();
        assert_eq!(p.id, "RES001");
        assert!(!p.is_eligible);
    }

    #[test]
    fn test_screening_rejects_missing_type_and_extra_answers() {
        let mut study = study();
        let mut s = screening(ParticipantType::Policymaker, "Kwame", &[]);
        s.participant_type = None;
        assert!(matches!(
            study.screen_participant(s),
            Err(StudyError::MissingParticipantType)
        ));

        let too_many = vec![Answer::Yes; 7];
        assert!(matches!(
            study.screen_participant(screening(ParticipantType::Policymaker, "Kwame", &too_many)),
            Err(StudyError::TooManyAnswers { expected: 6, given: 7, .. })
        ));
        assert!(study.participants().is_empty());
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let backend = Arc::new(MemoryStore::new());
        let mut study =
            Study::open_with_clock(LocalStore::new(backend.clone()), FixedClock::at(1_000));
        study
            .screen_participant(screening(ParticipantType::Caregiver, "Abena", &[Answer::Yes]))
            .unwrap();
        study
            .save_interview("CG001", InterviewKind::Idi, "first session")
            .unwrap();

        let reopened = Study::open_with_clock(LocalStore::new(backend), FixedClock::at(2_000));
        assert_eq!(reopened.participants().len(), 1);
        assert_eq!(reopened.interviews().len(), 1);
        assert_eq!(reopened.interviews()[0].notes, "first session");
        assert_eq!(reopened.next_participant_id(ParticipantType::Caregiver), "CG002");
    }

    #[test]
    fn test_failed_save_leaves_session_unchanged() {
        let backend = Arc::new(MemoryStore::with_quota(0));
        let mut study = Study::open_with_clock(LocalStore::new(backend), FixedClock::at(1_000));
        let err = study
            .screen_participant(screening(ParticipantType::Patient, "Ama", &[Answer::Yes]))
            .unwrap_err();
        assert!(matches!(err, StudyError::Store(ref e) if e.is_unavailable()));
        assert!(study.participants().is_empty());
        assert_eq!(study.next_participant_id(ParticipantType::Patient), "PAT001");

        assert!(study.add_recording("PAT001", InterviewKind::Idi, vec![1u8, 2, 3]).is_err());
        assert!(study.recordings().is_empty());
    }

    #[test]
    fn test_save_interview_requires_participant() {
        let mut study = study();
        assert!(matches!(
            study.save_interview("  ", InterviewKind::Idi, "notes"),
            Err(StudyError::MissingParticipant)
        ));
    }

    #[test]
    fn test_interview_ids_stay_unique_within_a_millisecond() {
        let mut study = study();
        let a = study.save_interview("PAT001", InterviewKind::Idi, "a").unwrap().id.clone();
        let b = study.save_interview("PAT001", InterviewKind::Fgd, "b").unwrap().id.clone();
        assert_eq!(a, "INT_1700000000000");
        assert_eq!(b, "INT_1700000000001");
    }

    #[test]
    fn test_complete_interview_flags_participant_and_latest_interview() {
        let backend = Arc::new(MemoryStore::new());
        let mut study =
            Study::open_with_clock(LocalStore::new(backend.clone()), FixedClock::at(5_000));
        study
            .screen_participant(screening(ParticipantType::Herbalist, "Kofi", &[Answer::Yes]))
            .unwrap();
        study.save_interview("HRB001", InterviewKind::Idi, "draft notes").unwrap();

        let completed = study
            .complete_interview("HRB001", InterviewKind::Idi, "final notes")
            .unwrap();
        assert!(completed.completed);
        assert_eq!(completed.notes, "final notes");

        assert!(study.participant("HRB001").unwrap().interview_completed);
        assert!(!study.interviews()[0].completed);
        assert!(study.interviews()[1].completed);

        // Both flags reached the store together
        let stored: PersistedDataset =
            serde_json::from_str(&backend.get(DATASET_KEY).unwrap().unwrap()).unwrap();
        assert!(stored.participants[0].interview_completed);
        assert!(stored.interviews[1].completed);
        assert_eq!(study.dashboard().interviews_completed, 1);
    }

    #[test]
    fn test_complete_interview_for_unknown_participant_is_tolerated() {
        let mut study = study();
        let interview = study
            .complete_interview("PAT404", InterviewKind::Fgd, "group notes")
            .unwrap();
        assert!(interview.completed);
        assert_eq!(interview.participant_id, "PAT404");
    }

    #[test]
    fn test_recordings_counted_not_stored() {
        let backend = Arc::new(MemoryStore::new());
        let mut study =
            Study::open_with_clock(LocalStore::new(backend.clone()), FixedClock::at(9_000));
        let rec = study
            .add_recording("PAT001", InterviewKind::Idi, vec![0u8; 16])
            .unwrap();
        assert_eq!(rec.id, "REC_9000");
        assert_eq!(rec.locator, "blob:REC_9000");
        assert_eq!(rec.duration_secs, 0.0);
        study.add_recording("PAT001", InterviewKind::Idi, vec![0u8; 16]).unwrap();

        assert_eq!(study.dashboard().audio_files, 2);
        let stored = LocalStore::new(backend).load();
        assert_eq!(stored.audio_count, 2);
    }

    #[test]
    fn test_clear_all_resets_session_but_keeps_drafts() {
        let mut study = study();
        study
            .screen_participant(screening(ParticipantType::Patient, "Ama", &[Answer::Yes]))
            .unwrap();
        study.save_draft("PAT001", "unfinished").unwrap();
        study.clear_all().unwrap();

        assert!(study.participants().is_empty());
        assert_eq!(study.next_participant_id(ParticipantType::Patient), "PAT001");
        assert_eq!(study.load_draft("PAT001").unwrap().as_deref(), Some("unfinished"));
    }

    #[test]
    fn test_dashboard_and_eligible_list() {
        let mut study = study();
        study
            .screen_participant(screening(ParticipantType::Patient, "Ama", &[Answer::Yes]))
            .unwrap();
        study
            .screen_participant(screening(ParticipantType::Patient, "Yaw", &[Answer::No]))
            .unwrap();
        study
            .screen_participant(screening(ParticipantType::Clinician, "Esi", &[Answer::Yes]))
            .unwrap();

        let stats = study.dashboard();
        assert_eq!(stats.total_participants, 3);
        assert_eq!(stats.eligible, 2);
        assert_eq!(stats.count_for(ParticipantType::Patient), 2);
        assert_eq!(stats.count_for(ParticipantType::Researcher), 0);

        let eligible: Vec<_> = study.eligible_participants().map(|p| p.id.as_str()).collect();
        assert_eq!(eligible, vec!["PAT001", "CLN001"]);

        let patients = study.filter_participants(&ParticipantFilter {
            participant_type: Some(ParticipantType::Patient),
            status: Some(EligibilityStatus::NotEligible),
            search: None,
        });
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].full_name, "Yaw");
    }
}
