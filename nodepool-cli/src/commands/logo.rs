//! Logo command.

use nodepool_version::{BannerFormatter, BannerOptions};
use std::io::Write;

use crate::error::CliResult;

pub fn run<W: Write>(out: &mut W, color: bool) -> CliResult<()> {
    BannerFormatter::new(BannerOptions { color }).write_logo(out)?;
    Ok(())
}
