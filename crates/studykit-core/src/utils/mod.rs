//! Utility functions for text formatting.

pub mod format;

pub use format::{csv_field, csv_quote, iso_date, locale_date, truncate_string, yes_no};
