//! Terminal rendering of [`Info`] and the project logo.

use owo_colors::OwoColorize;
use std::io::Write;

use crate::{Info, Result};

const RULE: &str = "----------------------------------------------";

/// Project logo as printed by `nodepool logo`.
pub const LOGO: &str = r"
╭╮╭━╮╱╱╭╮╱╱╱╱╱╱╱╭━╮╱╭╮╱╱╱╱╭╮╱╱╱╱╱╱╱╱╱╱╱╭╮╱╱╭━╮╭━╮
┃┃┃╭╯╱╱┃┃╱╱╱╱╱╱╱┃┃╰╮┃┃╱╱╱╱┃┃╱╱╱╱╱╱╱╱╱╱╱┃┃╱╱┃┃╰╯┃┃
┃╰╯╯╭╮╭┫╰━┳━━╮╱╱┃╭╮╰╯┣━━┳━╯┣━━┳━━┳━━┳━━┫┃╱╱┃╭╮╭╮┣━━┳━╮╭━━┳━━┳━━┳━╮
┃╭╮┃┃┃┃┃╭╮┃┃━╋━━┫┃╰╮┃┃╭╮┃╭╮┃┃━┫╭╮┃╭╮┃╭╮┃┣━━┫┃┃┃┃┃╭╮┃╭╮┫╭╮┃╭╮┃┃━┫╭╯
┃┃┃╰┫╰╯┃╰╯┃┃━╋━━┫┃╱┃┃┃╰╯┃╰╯┃┃━┫╰╯┃╰╯┃╰╯┃╰┳━┫┃┃┃┃┃╭╮┃┃┃┃╭╮┃╰╯┃┃━┫┃
╰╯╰━┻━━┻━━┻━━╯╱╱╰╯╱╰━┻━━┻━━┻━━┫╭━┻━━┻━━┻━╯╱╰╯╰╯╰┻╯╰┻╯╰┻╯╰┻━╮┣━━┻╯
╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱┃┃╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╭━╯┃
╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╰╯╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╱╰━━╯
";

/// Rendering options for a [`BannerFormatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerOptions {
    /// Emit ANSI styling. Terminal detection and `NO_COLOR` are not
    /// consulted; `false` always yields plain text.
    pub color: bool,
}

impl Default for BannerOptions {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Writes banners with its own styling choice; nothing global is touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BannerFormatter {
    options: BannerOptions,
}

impl BannerFormatter {
    pub fn new(options: BannerOptions) -> Self {
        Self { options }
    }

    /// Rule-delimited key/value summary of `info`.
    pub fn write_banner<W: Write>(&self, out: &mut W, info: &Info) -> Result<()> {
        let cores = format!("{} cores", info.runtime_cores);
        let mem = format!("{} KB", info.total_mem);
        let rows: [(&str, &str); 9] = [
            ("Author", info.author.as_str()),
            ("Version", info.version.as_str()),
            ("GitCommit", info.git_commit.as_str()),
            ("BuildDate", info.build_date.as_str()),
            ("RustVersion", info.rust_version.as_str()),
            ("Platform", info.platform.as_str()),
            ("RuntimeCores", cores.as_str()),
            ("TotalMem", mem.as_str()),
            ("KubeVersion", info.kube_version.as_str()),
        ];

        writeln!(out)?;
        writeln!(out, "{}", self.paint(RULE, |s| s.bright_blue().to_string()))?;
        for (label, value) in rows {
            writeln!(
                out,
                " {} {}",
                self.paint(&format!("{}:", label), |s| s.white().bold().to_string()),
                self.paint(value, |s| s.bright_green().bold().to_string())
            )?;
        }
        writeln!(out, "{}", self.paint(RULE, |s| s.bright_blue().to_string()))?;
        Ok(())
    }

    pub fn write_logo<W: Write>(&self, out: &mut W) -> Result<()> {
        write!(out, "{}", self.paint(LOGO, |s| s.bright_blue().bold().to_string()))?;
        Ok(())
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> String) -> String {
        if self.options.color {
            style(text)
        } else {
            text.to_string()
        }
    }
}
