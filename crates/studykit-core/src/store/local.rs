use tracing::{debug, warn};

use crate::models::PersistedDataset;

use super::{KeyValueStore, StoreError};

/// Key holding the serialized dataset.
pub const DATASET_KEY: &str = "hypertensionResearchData";

/// Prefix for per-participant interview drafts.
const DRAFT_KEY_PREFIX: &str = "draft_";

pub fn draft_key(participant_id: &str) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, participant_id)
}

/// Persistence for the study dataset and interview drafts.
pub struct LocalStore<K> {
    backend: K,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(backend: K) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    /// Replace the stored dataset.
    ///
    /// Serialization happens before the backend is touched, so a failure
    /// leaves the previous value in place.
    pub fn save(&self, dataset: &PersistedDataset) -> Result<(), StoreError> {
        let contents = serde_json::to_string(dataset)?;
        self.backend.set(DATASET_KEY, &contents)?;
        debug!(
            participants = dataset.participants.len(),
            interviews = dataset.interviews.len(),
            "Saved dataset"
        );
        Ok(())
    }

    /// Load the stored dataset, or an empty one when nothing usable is stored.
    pub fn load(&self) -> PersistedDataset {
        let contents = match self.backend.get(DATASET_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return PersistedDataset::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored dataset, starting empty");
                return PersistedDataset::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(error = %e, "Stored dataset is malformed, starting empty");
                PersistedDataset::default()
            }
        }
    }

    pub fn save_draft(&self, participant_id: &str, text: &str) -> Result<(), StoreError> {
        self.backend.set(&draft_key(participant_id), text)
    }

    pub fn load_draft(&self, participant_id: &str) -> Result<Option<String>, StoreError> {
        self.backend.get(&draft_key(participant_id))
    }

    /// Delete the stored dataset. Drafts are keyed separately and survive.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.backend.delete(DATASET_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Answer, CriterionAnswer, Interview, InterviewKind, Participant, ParticipantType,
    };
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn sample_dataset() -> PersistedDataset {
        let screened = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let mut data = PersistedDataset::default();
        data.participants.push(Participant {
            id: "PAT001".to_string(),
            participant_type: ParticipantType::Patient,
            study_site: "Koforidua".to_string(),
            full_name: "Ama \"Auntie\" Owusu".to_string(),
            age_range: "50-59".to_string(),
            gender: "female".to_string(),
            contact_number: "0241234567".to_string(),
            preferred_contact: "phone".to_string(),
            eligibility_criteria: vec![CriterionAnswer {
                question: "Aged 18 years or older".to_string(),
                answer: Answer::Yes,
            }],
            is_eligible: true,
            date_screened: screened,
            interview_completed: true,
        });
        data.interviews.push(Interview {
            id: "INT_1741948200000".to_string(),
            participant_id: "PAT001".to_string(),
            kind: InterviewKind::Idi,
            notes: "Uses moringa alongside amlodipine".to_string(),
            timestamp: screened,
            completed: true,
        });
        data.audio_count = 3;
        data.counters.insert(ParticipantType::Patient, 1);
        data
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = LocalStore::new(MemoryStore::new());
        let data = sample_dataset();
        store.save(&data).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.participants, data.participants);
        assert_eq!(loaded.interviews, data.interviews);
        assert_eq!(loaded.audio_count, 3);
    }

    #[test]
    fn test_load_absent_is_empty() {
        let store = LocalStore::new(MemoryStore::new());
        let loaded = store.load();
        assert!(loaded.participants.is_empty());
        assert!(loaded.interviews.is_empty());
    }

    #[test]
    fn test_load_corrupted_is_empty() {
        let backend = MemoryStore::new();
        backend.set(DATASET_KEY, "{not json").unwrap();
        let store = LocalStore::new(backend);
        assert!(store.load().is_empty());

        store.backend().set(DATASET_KEY, "[1, 2, 3]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_legacy_shape_without_counters() {
        let backend = MemoryStore::new();
        backend
            .set(
                DATASET_KEY,
                r#"{"participants":[],"interviews":[],"audioCount":0}"#,
            )
            .unwrap();
        let store = LocalStore::new(backend);
        let loaded = store.load();
        assert!(loaded.is_empty());
        assert!(loaded.counters.is_empty());
    }

    #[test]
    fn test_failed_save_keeps_previous_value() {
        let data = sample_dataset();
        let store = LocalStore::new(MemoryStore::with_quota(2048));
        store.save(&data).unwrap();

        let mut bigger = data.clone();
        bigger.interviews[0].notes = "x".repeat(4096);
        let err = store.save(&bigger).unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.load().interviews[0].notes, data.interviews[0].notes);
    }

    #[test]
    fn test_drafts_last_write_wins_and_survive_clear() {
        let store = LocalStore::new(MemoryStore::new());
        store.save(&sample_dataset()).unwrap();
        assert_eq!(store.load_draft("PAT001").unwrap(), None);

        store.save_draft("PAT001", "first").unwrap();
        store.save_draft("PAT001", "second").unwrap();
        store.clear_all().unwrap();

        assert!(store.load().is_empty());
        assert_eq!(store.load_draft("PAT001").unwrap().as_deref(), Some("second"));
        assert_eq!(store.backend().get("draft_PAT001").unwrap().as_deref(), Some("second"));
    }
}
