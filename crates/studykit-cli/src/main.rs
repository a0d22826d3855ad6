//! studykit - field toolkit for participant screening and interview capture.
//!
//! Works entirely from the local store; the `cache` commands manage the
//! offline copy of the web client's assets.
//!
//! Audio attached with `interview save|complete --audio` lives only for that
//! run: the store keeps the recording count, never the audio itself.

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use studykit_core::export::ExportKind;
use studykit_core::models::{InterviewKind, ParticipantType};
use studykit_core::study::EligibilityStatus;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Directory for daily log files; unset means stderr only.
const LOG_DIR_ENV: &str = "STUDYKIT_LOG_DIR";

#[derive(Parser)]
#[command(name = "studykit")]
#[command(about = "Participant screening, interview notes and offline asset cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a new participant against the eligibility criteria for their type
    Screen {
        #[arg(long = "type")]
        participant_type: ParticipantType,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        site: String,
        #[arg(long, default_value = "")]
        age_range: String,
        #[arg(long, default_value = "")]
        gender: String,
        #[arg(long, default_value = "")]
        contact: String,
        #[arg(long, default_value = "")]
        preferred_contact: String,
        /// Comma-separated yes/no answers in criteria order; `-` skips one
        #[arg(long, default_value = "")]
        answers: String,
    },
    /// List participants
    Participants {
        #[arg(long = "type")]
        participant_type: Option<ParticipantType>,
        #[arg(long)]
        status: Option<EligibilityStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Participants available for interview selection
    Eligible,
    /// Save or complete interview notes
    Interview {
        #[command(subcommand)]
        action: InterviewAction,
    },
    /// Work-in-progress interview notes
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Print the eligibility criteria for a participant type
    Criteria { participant_type: ParticipantType },
    /// Print the interview guide for a participant type
    Guide { participant_type: ParticipantType },
    /// Study totals
    Dashboard,
    /// Export participants or interviews as CSV
    Export {
        kind: ExportKind,
        /// Output file; defaults to `<kind>_<date>.csv` in the current directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete all participants and interviews (drafts are kept)
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Offline asset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum InterviewAction {
    /// Save notes without completing the interview
    Save(InterviewArgs),
    /// Save final notes and mark the participant's interview complete
    Complete(InterviewArgs),
}

#[derive(clap::Args)]
struct InterviewArgs {
    #[arg(long)]
    participant: String,
    #[arg(long, default_value = "idi")]
    kind: InterviewKind,
    #[arg(long, default_value = "")]
    notes: String,
    /// Audio file captured during the interview
    #[arg(long)]
    audio: Option<PathBuf>,
}

#[derive(Subcommand)]
enum DraftAction {
    Save {
        #[arg(long)]
        participant: String,
        #[arg(long)]
        text: String,
    },
    Show {
        #[arg(long)]
        participant: String,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Fetch every precache asset and activate this version
    Install,
    /// Activate an existing install, deleting other versions' caches
    Activate,
    /// Fetch a URL through the cache
    Fetch {
        url: String,
        /// Treat as a page navigation (network first, shell fallback)
        #[arg(long)]
        navigate: bool,
    },
    /// List cache buckets and their entries
    List,
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` controls the level (default `warn`). When `STUDYKIT_LOG_DIR`
/// is set, logs also go to a daily file there; the returned guard flushes
/// it on drop.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "studykit.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("studykit starting");

    let mut app = App::new()?;

    match cli.command {
        Commands::Screen {
            participant_type,
            name,
            site,
            age_range,
            gender,
            contact,
            preferred_contact,
            answers,
        } => app.screen(app::ScreenArgs {
            participant_type,
            full_name: name,
            study_site: site,
            age_range,
            gender,
            contact_number: contact,
            preferred_contact,
            answers,
        })?,
        Commands::Participants {
            participant_type,
            status,
            search,
        } => app.list_participants(participant_type, status, search),
        Commands::Eligible => app.list_eligible(),
        Commands::Interview { action } => match action {
            InterviewAction::Save(args) => app.save_interview(
                &args.participant,
                args.kind,
                &args.notes,
                args.audio.as_deref(),
                false,
            )?,
            InterviewAction::Complete(args) => app.save_interview(
                &args.participant,
                args.kind,
                &args.notes,
                args.audio.as_deref(),
                true,
            )?,
        },
        Commands::Draft { action } => match action {
            DraftAction::Save { participant, text } => app.save_draft(&participant, &text)?,
            DraftAction::Show { participant } => app.show_draft(&participant)?,
        },
        Commands::Criteria { participant_type } => app::print_criteria(participant_type),
        Commands::Guide { participant_type } => print!("{}", participant_type.guide().to_text()),
        Commands::Dashboard => app.dashboard(),
        Commands::Export { kind, out } => app.export(kind, out)?,
        Commands::Clear { yes } => app.clear(yes)?,
        Commands::Cache { action } => match action {
            CacheAction::Install => app.cache_install().await?,
            CacheAction::Activate => app.cache_activate().await?,
            CacheAction::Fetch { url, navigate } => app.cache_fetch(&url, navigate).await?,
            CacheAction::List => app.cache_list().await?,
        },
    }

    Ok(())
}
