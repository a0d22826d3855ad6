use crate::models::{AudioRecording, Participant, ParticipantType};

/// Counters shown on the study dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_participants: usize,
    pub eligible: usize,
    pub interviews_completed: usize,
    pub audio_files: usize,
    pub by_type: Vec<(ParticipantType, usize)>,
}

impl DashboardStats {
    pub fn compute(participants: &[Participant], recordings: &[AudioRecording]) -> Self {
        let by_type = ParticipantType::ALL
            .iter()
            .map(|t| {
                let count = participants
                    .iter()
                    .filter(|p| p.participant_type == *t)
                    .count();
                (*t, count)
            })
            .collect();

        Self {
            total_participants: participants.len(),
            eligible: participants.iter().filter(|p| p.is_eligible).count(),
            interviews_completed: participants.iter().filter(|p| p.interview_completed).count(),
            audio_files: recordings.len(),
            by_type,
        }
    }

    pub fn count_for(&self, participant_type: ParticipantType) -> usize {
        self.by_type
            .iter()
            .find(|(t, _)| *t == participant_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}
