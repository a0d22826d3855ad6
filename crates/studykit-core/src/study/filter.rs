use std::str::FromStr;

use crate::models::{Participant, ParticipantType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityStatus {
    Eligible,
    NotEligible,
}

impl FromStr for EligibilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eligible" => Ok(EligibilityStatus::Eligible),
            "not-eligible" | "not_eligible" | "ineligible" => Ok(EligibilityStatus::NotEligible),
            other => Err(format!("Unknown status '{}' (expected eligible or not-eligible)", other)),
        }
    }
}

/// Participant list filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ParticipantFilter {
    pub participant_type: Option<ParticipantType>,
    pub status: Option<EligibilityStatus>,
    /// Case-insensitive substring of full name or ID.
    pub search: Option<String>,
}

impl ParticipantFilter {
    pub fn matches(&self, participant: &Participant) -> bool {
        let matches_type = self
            .participant_type
            .map_or(true, |t| participant.participant_type == t);

        let matches_status = match self.status {
            None => true,
            Some(EligibilityStatus::Eligible) => participant.is_eligible,
            Some(EligibilityStatus::NotEligible) => !participant.is_eligible,
        };

        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                participant.full_name.to_lowercase().contains(&term)
                    || participant.id.to_lowercase().contains(&term)
            }
        };

        matches_type && matches_status && matches_search
    }
}
