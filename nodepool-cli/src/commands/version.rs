//! Version command - print build and host information.

use nodepool_distributed::{CallContext, ServerVersion, StaticServerVersion, discover_server_version};
use nodepool_version::{BannerFormatter, BannerOptions, Info};
use std::io::Write;
use std::time::Duration;

use crate::error::CliResult;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Output encodings of `nodepool version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Banner,
    Yaml,
    Json,
}

/// Discovery source for the configured cluster.
pub fn server_version_source(settings: &nodepool_config::KubeSettings) -> StaticServerVersion {
    if settings.server_version.is_empty() {
        StaticServerVersion::unavailable()
    } else {
        StaticServerVersion::new(settings.server_version.clone())
    }
}

/// Print version info. `kube_version` wins over discovery; a failed
/// discovery reports `N/A`.
pub async fn run<W: Write>(
    out: &mut W,
    format: OutputFormat,
    kube_version: Option<&str>,
    discovery: &dyn ServerVersion,
    color: bool,
) -> CliResult<()> {
    let discovered = match kube_version {
        Some(_) => None,
        None => {
            let ctx = CallContext::new().with_timeout(DISCOVERY_TIMEOUT);
            discover_server_version(&ctx, discovery).await
        }
    };

    let info = Info::collect(kube_version.or(discovered.as_deref()));
    tracing::debug!(version = %info.version, platform = %info.platform, "Collected version info");

    match format {
        OutputFormat::Banner => {
            BannerFormatter::new(BannerOptions { color }).write_banner(out, &info)?;
        }
        OutputFormat::Yaml => writeln!(out, "{}", info.to_yaml()?)?,
        OutputFormat::Json => writeln!(out, "{}", info.to_json()?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodepool_config::KubeSettings;

    async fn render(format: OutputFormat, flag: Option<&str>, source: &StaticServerVersion) -> String {
        let mut out = Vec::new();
        run(&mut out, format, flag, source, false).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_yaml_output_uses_flag() {
        let source = StaticServerVersion::new("v1.28.0");
        let text = render(OutputFormat::Yaml, Some("v1.29.4"), &source).await;

        assert!(text.contains("KubernetesVersion: v1.29.4"));
        assert!(text.ends_with('\n'));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_discovered_version_without_flag() {
        let source = StaticServerVersion::new("v1.28.0");
        let text = render(OutputFormat::Banner, None, &source).await;

        assert!(text.contains(" KubeVersion: v1.28.0"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_discovery_shows_not_available() {
        let source = server_version_source(&KubeSettings::default());
        let text = render(OutputFormat::Banner, None, &source).await;

        assert!(text.contains(" KubeVersion: N/A"));
        assert!(!text.contains('\u{1b}'));
    }

    #[tokio::test]
    async fn test_source_from_settings() {
        let settings = KubeSettings {
            server_version: "v1.31.2".to_string(),
        };
        let source = server_version_source(&settings);
        let text = render(OutputFormat::Yaml, None, &source).await;
        assert!(text.contains("KubernetesVersion: v1.31.2"));
    }
}
