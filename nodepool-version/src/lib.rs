//! Build and runtime information for the node-pool manager.
//!
//! Build values are read at compile time from `NODEPOOL_VERSION`,
//! `NODEPOOL_GIT_COMMIT` and `NODEPOOL_BUILD_DATE`; unset ones read `N/A`.
//!
//! ```rust
//! use nodepool_version::{BannerFormatter, BannerOptions, Info};
//!
//! let info = Info::collect(Some("v1.31.0"));
//! let mut out = Vec::new();
//! BannerFormatter::new(BannerOptions { color: false })
//!     .write_banner(&mut out, &info)
//!     .unwrap();
//!
//! assert!(String::from_utf8(out).unwrap().contains("KubeVersion: v1.31.0"));
//! ```

mod banner;

pub use banner::{BannerFormatter, BannerOptions, LOGO};

use serde::{Deserialize, Serialize};
use std::thread;

/// Author recorded when the build does not override it.
pub const DEFAULT_AUTHOR: &str = "CodeFuture Authors";

const NOT_AVAILABLE: &str = "N/A";

/// Errors from rendering an [`Info`].
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// Version and host information of the running binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Git Commit")]
    pub git_commit: String,
    #[serde(rename = "Build Date")]
    pub build_date: String,
    #[serde(rename = "Rust Version")]
    pub rust_version: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "KubernetesVersion")]
    pub kube_version: String,
    #[serde(rename = "RuntimeCores")]
    pub runtime_cores: usize,
    /// Resident memory of this process in KB.
    #[serde(rename = "TotalMem")]
    pub total_mem: u64,
}

impl Info {
    /// Gather build values and a snapshot of the host.
    pub fn collect(kube_version: Option<&str>) -> Self {
        Self {
            author: option_env!("NODEPOOL_AUTHOR")
                .unwrap_or(DEFAULT_AUTHOR)
                .to_string(),
            version: option_env!("NODEPOOL_VERSION")
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            git_commit: option_env!("NODEPOOL_GIT_COMMIT")
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            build_date: option_env!("NODEPOOL_BUILD_DATE")
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            rust_version: env!("NODEPOOL_RUSTC_VERSION").to_string(),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            kube_version: kube_version.unwrap_or(NOT_AVAILABLE).to_string(),
            runtime_cores: thread::available_parallelism().map_or(1, |n| n.get()),
            total_mem: resident_memory_kb(),
        }
    }

    /// YAML rendering without the trailing newline.
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml.trim().to_string())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(target_os = "linux")]
fn resident_memory_kb() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_vm_rss(&status))
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_kb() -> u64 {
    0
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
