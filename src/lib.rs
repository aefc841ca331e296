pub mod cli;
pub mod config;
pub mod diagnose;
pub mod dns;
pub mod http;
pub mod network;
pub mod output;
pub mod summary;
pub mod utils;

pub use config::ProbeConfig;
pub use diagnose::{DiagnosticReport, Diagnostics};
pub use summary::{summarize, Thresholds, Verdict, VerdictKind};
pub use utils::*;
