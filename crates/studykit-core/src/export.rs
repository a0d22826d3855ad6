//! CSV export of the dataset and the session recording listing.
//!
//! Every line, header included, ends with `\n`. Names and notes are always
//! quoted; other text columns are quoted only when they contain a
//! separator, quote or line break.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::{AudioRecording, Interview, Participant};
use crate::utils::{csv_field, csv_quote, iso_date, locale_date, yes_no};

pub const PARTICIPANTS_HEADER: &str = "Participant ID,Type,Study Site,Full Name,Age Range,Gender,Contact Number,Preferred Contact,Eligible,Date Screened,Interview Completed";

pub const INTERVIEWS_HEADER: &str = "Interview ID,Participant ID,Type,Notes,Timestamp,Completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Participants,
    Interviews,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Participants => "participants",
            ExportKind::Interviews => "interviews",
        }
    }

    /// `<kind>_<YYYY-MM-DD>.csv`
    pub fn filename(&self, on: DateTime<Utc>) -> String {
        format!("{}_{}.csv", self.as_str(), iso_date(on))
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "participants" => Ok(ExportKind::Participants),
            "interviews" => Ok(ExportKind::Interviews),
            other => Err(format!(
                "Unknown export '{}' (expected participants or interviews)",
                other
            )),
        }
    }
}

pub fn participants_csv(participants: &[Participant]) -> String {
    let mut csv = String::from(PARTICIPANTS_HEADER);
    csv.push('\n');
    for p in participants {
        let row = [
            csv_field(&p.id),
            p.participant_type.as_str().to_string(),
            csv_field(&p.study_site),
            csv_quote(&p.full_name),
            csv_field(&p.age_range),
            csv_field(&p.gender),
            csv_field(&p.contact_number),
            csv_field(&p.preferred_contact),
            yes_no(p.is_eligible).to_string(),
            locale_date(p.date_screened),
            yes_no(p.interview_completed).to_string(),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

pub fn interviews_csv(interviews: &[Interview]) -> String {
    let mut csv = String::from(INTERVIEWS_HEADER);
    csv.push('\n');
    for i in interviews {
        let row = [
            csv_field(&i.id),
            csv_field(&i.participant_id),
            i.kind.as_str().to_string(),
            csv_quote(&i.notes),
            locale_date(i.timestamp),
            yes_no(i.completed).to_string(),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

/// Human-readable listing of this session's recordings, or `None` when
/// there are none.
pub fn audio_listing(recordings: &[AudioRecording]) -> Option<String> {
    if recordings.is_empty() {
        return None;
    }
    let mut list = String::from("Available Audio Recordings:\n\n");
    for (i, rec) in recordings.iter().enumerate() {
        list.push_str(&format!(
            "{}. {} - Participant: {}\n   Type: {} - Date: {}\n\n",
            i + 1,
            rec.id,
            rec.participant_id,
            rec.kind,
            locale_date(rec.timestamp)
        ));
    }
    Some(list)
}
