use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::interview::Interview;
use super::participant::{Participant, ParticipantType};

/// Everything written to the persistence store in one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDataset {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub interviews: Vec<Interview>,
    #[serde(default)]
    pub audio_count: usize,
    /// Last sequence number issued per participant type.
    #[serde(default)]
    pub counters: BTreeMap<ParticipantType, u32>,
}

impl PersistedDataset {
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.interviews.is_empty()
    }

    pub fn count_of_type(&self, participant_type: ParticipantType) -> usize {
        self.participants
            .iter()
            .filter(|p| p.participant_type == participant_type)
            .count()
    }

    /// Sequence number for the next participant of this type.
    ///
    /// Uses the persisted counter, never going below what a scan of the
    /// existing participants would give (datasets saved without counters).
    pub fn next_sequence(&self, participant_type: ParticipantType) -> u32 {
        let counted = u32::try_from(self.count_of_type(participant_type)).unwrap_or(u32::MAX);
        let issued = self.counters.get(&participant_type).copied().unwrap_or(0);
        issued.max(counted).saturating_add(1)
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    /// Index of the latest interview for a participant: greatest timestamp,
    /// ties going to the one inserted last.
    pub fn latest_interview_index(&self, participant_id: &str) -> Option<usize> {
        self.interviews
            .iter()
            .enumerate()
            .filter(|(_, i)| i.participant_id == participant_id)
            .max_by_key(|(index, i)| (i.timestamp, *index))
            .map(|(index, _)| index)
    }
}
