use std::path::Path;
use std::process::ExitCode;

use tracing::error;

use minewatch_core::MonitorConfig;

pub mod check;
pub mod run;
pub mod status;

/// Exit status for an unreadable or invalid configuration.
pub const EXIT_CONFIG: u8 = 2;

/// Load the configuration, logging the reason on failure.
pub fn load_config(path: &Path) -> Result<MonitorConfig, ExitCode> {
    MonitorConfig::from_file(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "invalid configuration");
        ExitCode::from(EXIT_CONFIG)
    })
}
