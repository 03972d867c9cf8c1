//! Known server set and its on-disk form.

pub mod file;
pub mod list;

pub use file::{list_path, load, save};
pub use list::{ReconcileSummary, ServerList};
