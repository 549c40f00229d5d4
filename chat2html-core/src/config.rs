use std::env;
use std::ffi::OsString;

use chrono::{DateTime, Local, Utc};

use crate::error::{ConvertError, Result};

pub const TIMEZONE_ENV: &str = "CHAT2HTML_TIMEZONE";
pub const THEME_TOGGLE_ENV: &str = "CHAT2HTML_THEME_TOGGLE";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZoneMode {
    #[default]
    Local,
    Utc,
}

impl TimeZoneMode {
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(ConvertError::InvalidOption(format!(
                "{TIMEZONE_ENV}={other} (expected local or utc)"
            ))),
        }
    }

    pub fn format_millis(self, millis: i64) -> Option<String> {
        let utc = DateTime::<Utc>::from_timestamp_millis(millis)?;
        let rendered = match self {
            Self::Local => utc.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
            Self::Utc => utc.format(TIMESTAMP_FORMAT).to_string(),
        };
        Some(rendered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub time_zone: TimeZoneMode,
    pub theme_toggle: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            time_zone: TimeZoneMode::Local,
            theme_toggle: true,
        }
    }
}

impl ConvertOptions {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key: &str| env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let mut options = Self::default();

        // Precedence:
        // 1) CHAT2HTML_TIMEZONE (non-empty)
        // 2) local time
        if let Some(value) = non_empty(lookup(TIMEZONE_ENV)) {
            options.time_zone = TimeZoneMode::parse(&value)?;
        }

        // Precedence:
        // 1) CHAT2HTML_THEME_TOGGLE (non-empty)
        // 2) toggle enabled
        if let Some(value) = non_empty(lookup(THEME_TOGGLE_ENV)) {
            options.theme_toggle = parse_switch(THEME_TOGGLE_ENV, &value)?;
        }

        Ok(options)
    }
}

fn non_empty(value: Option<OsString>) -> Option<String> {
    value
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string_lossy().into_owned())
}

fn parse_switch(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(ConvertError::InvalidOption(format!(
            "{key}={other} (expected a boolean switch)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ffi::OsString;

    use chrono::NaiveDateTime;

    use crate::config::{ConvertOptions, THEME_TOGGLE_ENV, TIMEZONE_ENV, TimeZoneMode};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), OsString::from(value)))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let options = ConvertOptions::from_lookup(lookup(&[])).expect("options");
        assert_eq!(options, ConvertOptions::default());
        assert!(options.theme_toggle);
        assert_eq!(options.time_zone, TimeZoneMode::Local);
    }

    #[test]
    fn env_overrides_defaults() {
        let options = ConvertOptions::from_lookup(lookup(&[
            (TIMEZONE_ENV, "UTC"),
            (THEME_TOGGLE_ENV, "off"),
        ]))
        .expect("options");

        assert_eq!(options.time_zone, TimeZoneMode::Utc);
        assert!(!options.theme_toggle);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let options = ConvertOptions::from_lookup(lookup(&[(TIMEZONE_ENV, "")])).expect("options");
        assert_eq!(options.time_zone, TimeZoneMode::Local);
    }

    #[test]
    fn unknown_env_value_is_rejected() {
        let err = ConvertOptions::from_lookup(lookup(&[(TIMEZONE_ENV, "mars")]))
            .expect_err("must fail");
        assert!(format!("{err}").contains("invalid option"));
    }

    #[test]
    fn utc_formatting_is_fixed() {
        let rendered = TimeZoneMode::Utc
            .format_millis(1_700_000_000_123)
            .expect("format");
        assert_eq!(rendered, "2023-11-14 22:13:20");
    }

    #[test]
    fn formatted_timestamp_parses_back_to_same_second() {
        let millis = 1_718_035_200_999;
        let rendered = TimeZoneMode::Utc.format_millis(millis).expect("format");
        let parsed =
            NaiveDateTime::parse_from_str(&rendered, "%Y-%m-%d %H:%M:%S").expect("parse back");

        assert_eq!(parsed.and_utc().timestamp(), millis / 1000);
    }
}
