//! Configuration management for gort.
//!
//! Engine defaults live in an optional JSON file under the XDG config
//! directory. Nothing here is process-wide mutable state: settings are
//! loaded once and handed to [`ScanBuilder::from_settings`].
//!
//! [`ScanBuilder::from_settings`]: crate::scanner::ScanBuilder::from_settings

mod settings;

pub use settings::{EngineSettings, Paths};
