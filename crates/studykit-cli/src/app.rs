//! Command handlers.
//!
//! `App` owns the configuration and the opened study; every handler prints
//! its result to stdout and leaves diagnostics to `tracing`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use studykit_core::export::{self, ExportKind};
use studykit_core::models::{Answer, InterviewKind, Participant, ParticipantType, Screening};
use studykit_core::offline::{
    CacheStorage, DirCacheStorage, FetchRequest, HttpFetcher, Interception, OfflineCacheManager,
};
use studykit_core::store::{FileStore, LocalStore};
use studykit_core::study::{EligibilityStatus, ParticipantFilter};
use studykit_core::utils::{locale_date, truncate_string, yes_no};
use studykit_core::{Config, Study};
use tracing::{debug, info};

/// Width of the name column in participant listings
const NAME_WIDTH: usize = 28;

type CacheManager = OfflineCacheManager<DirCacheStorage, HttpFetcher>;

pub struct ScreenArgs {
    pub participant_type: ParticipantType,
    pub full_name: String,
    pub study_site: String,
    pub age_range: String,
    pub gender: String,
    pub contact_number: String,
    pub preferred_contact: String,
    pub answers: String,
}

pub struct App {
    config: Config,
    study: Study<FileStore>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().context("Failed to load config")?;
        let data_dir = config.data_dir()?;
        debug!(data_dir = %data_dir.display(), "Opening study store");
        let backend = FileStore::new(data_dir.clone())
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        Ok(Self {
            study: Study::open(LocalStore::new(backend)),
            config,
        })
    }

    // ===== Participants =====

    pub fn screen(&mut self, args: ScreenArgs) -> Result<()> {
        let screening = Screening {
            participant_type: Some(args.participant_type),
            study_site: args.study_site,
            full_name: args.full_name,
            age_range: args.age_range,
            gender: args.gender,
            contact_number: args.contact_number,
            preferred_contact: args.preferred_contact,
            answers: parse_answers(&args.answers)?,
        };
        screening.validate()?;

        let participant = self.study.screen_participant(screening)?;
        if participant.is_eligible {
            println!(
                "{} registered. Participant is ELIGIBLE for the study.",
                participant.id
            );
        } else {
            println!(
                "{} registered. Participant is NOT ELIGIBLE for the study.",
                participant.id
            );
        }
        Ok(())
    }

    pub fn list_participants(
        &self,
        participant_type: Option<ParticipantType>,
        status: Option<EligibilityStatus>,
        search: Option<String>,
    ) {
        let filter = ParticipantFilter {
            participant_type,
            status,
            search,
        };
        let participants = self.study.filter_participants(&filter);
        if participants.is_empty() {
            println!("No participants found.");
            return;
        }
        for participant in participants {
            print_participant(participant);
        }
    }

    pub fn list_eligible(&self) {
        let mut any = false;
        for participant in self.study.eligible_participants() {
            any = true;
            println!(
                "{} - {} ({})",
                participant.id, participant.full_name, participant.participant_type
            );
        }
        if !any {
            println!("No eligible participants yet.");
        }
    }

    pub fn dashboard(&self) {
        let stats = self.study.dashboard();
        println!("Total participants:    {}", stats.total_participants);
        println!("Eligible:              {}", stats.eligible);
        println!("Interviews completed:  {}", stats.interviews_completed);
        println!("Audio recordings:      {}", stats.audio_files);
        println!();
        for (participant_type, count) in &stats.by_type {
            println!("{:<14} {}", participant_type.display_name(), count);
        }
    }

    // ===== Interviews =====

    pub fn save_interview(
        &mut self,
        participant_id: &str,
        kind: InterviewKind,
        notes: &str,
        audio: Option<&Path>,
        complete: bool,
    ) -> Result<()> {
        if self.study.participant(participant_id).is_none() {
            bail!("Unknown participant {}", participant_id);
        }
        let audio = audio
            .map(|path| {
                std::fs::read(path)
                    .with_context(|| format!("Failed to read audio {}", path.display()))
            })
            .transpose()?;

        let interview = if complete {
            self.study.complete_interview(participant_id, kind, notes)?
        } else {
            self.study.save_interview(participant_id, kind, notes)?
        };
        println!(
            "{} saved for {}{}",
            interview.id,
            participant_id,
            if complete { " (completed)" } else { "" }
        );

        if let Some(blob) = audio {
            let recording = self.study.add_recording(participant_id, kind, blob)?;
            debug!(id = %recording.id, bytes = recording.blob.len(), "Attached audio");
            if let Some(listing) = export::audio_listing(self.study.recordings()) {
                print!("{}", listing);
            }
        }
        Ok(())
    }

    pub fn save_draft(&self, participant_id: &str, text: &str) -> Result<()> {
        self.study.save_draft(participant_id, text)?;
        println!("Draft saved for {}", participant_id);
        Ok(())
    }

    pub fn show_draft(&self, participant_id: &str) -> Result<()> {
        match self.study.load_draft(participant_id)? {
            Some(text) => println!("{}", text),
            None => println!("No draft for {}", participant_id),
        }
        Ok(())
    }

    // ===== Export / reset =====

    pub fn export(&self, kind: ExportKind, out: Option<PathBuf>) -> Result<()> {
        let csv = match kind {
            ExportKind::Participants => export::participants_csv(self.study.participants()),
            ExportKind::Interviews => export::interviews_csv(self.study.interviews()),
        };
        let path = out.unwrap_or_else(|| PathBuf::from(kind.filename(Utc::now())));
        std::fs::write(&path, csv)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(kind = %kind, path = %path.display(), "Exported");
        println!("Exported {} to {}", kind, path.display());
        Ok(())
    }

    pub fn clear(&mut self, confirmed: bool) -> Result<()> {
        if !confirmed {
            bail!("This deletes all participants and interviews. Re-run with --yes to confirm.");
        }
        self.study.clear_all()?;
        println!("All study data cleared.");
        Ok(())
    }

    // ===== Offline cache =====

    async fn cache_manager(&self) -> Result<CacheManager> {
        let settings = self.config.offline.clone();
        let storage = DirCacheStorage::new(self.config.cache_dir()?).await?;
        let fetcher = HttpFetcher::new(
            settings.scope_url()?,
            settings.request_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(OfflineCacheManager::new(
            settings,
            Arc::new(storage),
            Arc::new(fetcher),
        )?)
    }

    pub async fn cache_install(&self) -> Result<()> {
        let manager = self.cache_manager().await?;
        manager.install().await.context("Install failed")?;
        println!("Installed {}", manager.precache_name());
        report_activation(&manager.activate().await?);
        Ok(())
    }

    pub async fn cache_activate(&self) -> Result<()> {
        let manager = self.cache_manager().await?;
        if !manager.resume().await? {
            bail!(
                "{} is not installed; run `studykit cache install` first",
                manager.precache_name()
            );
        }
        report_activation(&manager.activate().await?);
        Ok(())
    }

    pub async fn cache_fetch(&self, url: &str, navigate: bool) -> Result<()> {
        let manager = self.cache_manager().await?;
        if manager.resume().await? {
            manager.activate().await?;
        }

        let url = self.config.offline.resolve(url)?;
        let request = if navigate {
            FetchRequest::navigate(url)
        } else {
            FetchRequest::get(url)
        };

        match manager.handle_fetch(request).await? {
            Interception::Respond(response) => {
                println!(
                    "{} {} ({} bytes{})",
                    response.status,
                    response.url,
                    response.body.len(),
                    response
                        .content_type
                        .as_deref()
                        .map(|ct| format!(", {}", ct))
                        .unwrap_or_default()
                );
            }
            Interception::PassThrough => println!("Not handled by the offline cache"),
        }

        manager.wait_for_revalidations().await;
        Ok(())
    }

    pub async fn cache_list(&self) -> Result<()> {
        let manager = self.cache_manager().await?;
        let storage = manager.storage();
        let buckets = storage.keys().await?;
        if buckets.is_empty() {
            println!("No caches");
            return Ok(());
        }
        for bucket in buckets {
            let current = bucket == manager.precache_name() || bucket == manager.runtime_name();
            println!("{}{}", bucket, if current { "" } else { " (stale)" });
            for entry in storage.entry_info(&bucket).await? {
                println!(
                    "  {} {} {}B {}",
                    entry.status, entry.url, entry.bytes, entry.age
                );
            }
        }
        Ok(())
    }
}

fn report_activation(deleted: &[String]) {
    println!("Activated");
    for bucket in deleted {
        println!("  deleted {}", bucket);
    }
}

fn print_participant(participant: &Participant) {
    println!(
        "{:<8} {:<width$} {:<12} eligible: {:<3} interviewed: {:<3} screened {}",
        participant.id,
        truncate_string(&participant.full_name, NAME_WIDTH),
        participant.participant_type.as_str(),
        yes_no(participant.is_eligible),
        yes_no(participant.interview_completed),
        locale_date(participant.date_screened),
        width = NAME_WIDTH,
    );
}

pub fn print_criteria(participant_type: ParticipantType) {
    println!("{} eligibility criteria:", participant_type.display_name());
    for (i, criterion) in participant_type.criteria().iter().enumerate() {
        println!("  {}. {}", i + 1, criterion);
    }
}

/// Parse `yes,no,-,y` into positional answers; `-` or an empty slot is
/// left unanswered.
fn parse_answers(raw: &str) -> Result<Vec<Option<Answer>>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| match part.trim() {
            "" | "-" => Ok(None),
            answer => answer
                .parse::<Answer>()
                .map(Some)
                .map_err(anyhow::Error::msg),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers() {
        assert_eq!(parse_answers("").unwrap(), Vec::<Option<Answer>>::new());
        assert_eq!(
            parse_answers("yes, n,-,,Y").unwrap(),
            vec![
                Some(Answer::Yes),
                Some(Answer::No),
                None,
                None,
                Some(Answer::Yes)
            ]
        );
        assert!(parse_answers("yes,maybe").is_err());
    }

    fn test_app(dir: &Path) -> App {
        let backend = FileStore::new(dir.join("data")).unwrap();
        App {
            config: Config::default(),
            study: Study::open(LocalStore::new(backend)),
        }
    }

    fn screen_args() -> ScreenArgs {
        ScreenArgs {
            participant_type: ParticipantType::Patient,
            full_name: "Ama Mensah".to_string(),
            study_site: "Koforidua".to_string(),
            age_range: "36-45".to_string(),
            gender: "female".to_string(),
            contact_number: String::new(),
            preferred_contact: String::new(),
            answers: "yes,yes,yes,yes".to_string(),
        }
    }

    #[test]
    fn test_save_interview_attaches_audio() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("take1.webm");
        std::fs::write(&audio, [1u8, 2, 3, 4]).unwrap();

        let mut app = test_app(dir.path());
        app.screen(screen_args()).unwrap();
        app.save_interview("PAT001", InterviewKind::Idi, "first notes", Some(&audio), false)
            .unwrap();
        app.save_interview("PAT001", InterviewKind::Idi, "final notes", None, true)
            .unwrap();

        let recordings = app.study.recordings();
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].participant_id, "PAT001");
        assert_eq!(&recordings[0].blob[..], &[1u8, 2, 3, 4][..]);
        assert_eq!(app.study.dashboard().audio_files, 1);
        assert_eq!(app.study.interviews().len(), 2);
    }

    #[test]
    fn test_save_interview_missing_audio_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.screen(screen_args()).unwrap();

        let missing = dir.path().join("missing.webm");
        let err = app
            .save_interview("PAT001", InterviewKind::Idi, "notes", Some(&missing), false)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read audio"));
        assert!(app.study.interviews().is_empty());
        assert!(app.study.recordings().is_empty());
    }
}
