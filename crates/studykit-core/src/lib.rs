//! Core library for studykit.
//!
//! Two independent collaborators of the rendering layer live here:
//!
//! - [`store`]: the local persistence store for the participants and
//!   interviews dataset, plus per-participant interview drafts.
//! - [`offline`]: the offline cache manager that precaches the application
//!   shell and intercepts fetches (network-first navigations,
//!   stale-while-revalidate for static assets).
//!
//! [`Study`] is the explicit state container the front end drives; it loads
//! from the store once and writes back on every mutation.

pub mod clock;
pub mod config;
pub mod export;
pub mod models;
pub mod offline;
pub mod store;
pub mod study;
pub mod utils;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use study::{Study, StudyError};
