/// Build metadata embedded by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub profile: &'static str,
}

impl BuildMetadata {
    /// One-line summary printed by the CLI `version` command.
    pub fn summary(&self) -> String {
        format!(
            "recurring_core {} ({} {}, {} build, {})",
            self.version, self.git_hash, self.git_status, self.profile, self.timestamp
        )
    }
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("RECURRING_CORE_BUILD_HASH").unwrap_or("unknown"),
        git_status: option_env!("RECURRING_CORE_BUILD_STATUS").unwrap_or("unknown"),
        timestamp: option_env!("RECURRING_CORE_BUILD_TIMESTAMP").unwrap_or("unknown"),
        profile: option_env!("RECURRING_CORE_BUILD_PROFILE").unwrap_or("unknown"),
    }
}
