//! Where the CLI finds its defaults, and parsing for flag values that the
//! core takes in typed form.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "orgsite";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// `~/.config/orgsite/config.yaml` on Linux, the platform equivalent elsewhere
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// An explicit `--config` wins; otherwise the user config, if present.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => user_config_path().filter(|path| path.exists()),
    }
}

/// `YYYY-MM-DD` as local midnight, for pinning the export date
pub fn parse_export_date(value: &str) -> Result<DateTime<Local>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid time for {value}"))?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .ok_or_else(|| anyhow!("{value} has no local midnight"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_wins() {
        let explicit = Path::new("/tmp/site.yaml");
        assert_eq!(config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }

    #[test]
    fn test_user_config_location() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with("orgsite/config.yaml"));
        }
    }

    #[test]
    fn test_parse_export_date() {
        let at = parse_export_date("2024-03-07").unwrap();
        assert_eq!(at.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert!(parse_export_date("07/03/2024").is_err());
    }
}
