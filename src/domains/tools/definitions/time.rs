//! Current time tool definition.
//!
//! A synchronous tool that reports the current time in a named timezone or a
//! fixed UTC offset.

use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::core::config::Config;
use crate::domains::tools::{ModuleExports, Tool, ToolDescriptor, ToolModule};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the current time tool.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetCurrentTimeParams {
    /// Timezone name or `±HH:MM` offset. Empty or absent uses the default.
    #[serde(default)]
    pub timezone: Option<String>,
}

// ============================================================================
// Timezone Parsing
// ============================================================================

/// A resolved timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    /// Parse an IANA name (`America/New_York`, any letter case) or an
    /// offset (`-05:00`).
    pub fn parse(input: &str) -> Option<Self> {
        if let Ok(tz) = input.parse::<Tz>() {
            return Some(Self::Named(tz));
        }
        if let Ok(tz) = Tz::from_str_insensitive(input) {
            return Some(Self::Named(tz));
        }
        parse_offset(input).map(Self::Fixed)
    }

    /// Format `instant` in this zone as ISO 8601 with microseconds.
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        match self {
            Self::Named(tz) => iso(instant.with_timezone(tz)),
            Self::Fixed(offset) => iso(instant.with_timezone(offset)),
        }
    }
}

fn iso<Z: TimeZone>(dt: DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse `+HH:MM` / `-HH:MM`. Hours must be below 24 and minutes below 60.
fn parse_offset(input: &str) -> Option<FixedOffset> {
    let (sign, rest) = if let Some(rest) = input.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = input.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };

    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse::<u8>().ok()?.into();
    let minutes: i32 = minutes.parse::<u8>().ok()?.into();
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Current time tool.
pub struct GetCurrentTimeTool;

impl GetCurrentTimeTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_current_time";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Get the current time for a given timezone and returns it in ISO 8601 format (e.g., '2025-07-17T20:05:00+00:00').";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::builder(Self::NAME, Self::DESCRIPTION)
            .param(
                "timezone",
                "string",
                "The timezone name (e.g., 'America/New_York') or UTC offset (e.g., '-05:00'). Defaults to UTC.",
            )
            .build()
    }

    /// Execute the tool logic.
    ///
    /// An unknown timezone is reported in the result text, not as an error.
    #[instrument(skip_all, fields(timezone = ?params.timezone))]
    pub fn execute(params: &GetCurrentTimeParams, default_zone: Zone) -> String {
        let requested = params.timezone.as_deref().filter(|tz| !tz.is_empty());

        let zone = match requested {
            None => default_zone,
            Some(tz) => match Zone::parse(tz) {
                Some(zone) => zone,
                None => {
                    warn!("Invalid timezone requested: {}", tz);
                    return format!(
                        "Error: Invalid timezone '{}'. Use a name like 'Europe/London' or an offset like '-05:00'.",
                        tz
                    );
                }
            },
        };

        let now = zone.format(Utc::now());
        info!("Current time resolved: {}", now);
        now
    }

    /// Bind the descriptor to a handler using `default_zone`.
    pub fn to_tool(default_zone: Zone) -> Tool {
        Tool::sync(Self::descriptor(), move |params: GetCurrentTimeParams| {
            Ok(Self::execute(&params, default_zone))
        })
    }
}

// ============================================================================
// Module
// ============================================================================

/// Module exporting [`GetCurrentTimeTool`].
pub struct TimeModule;

impl ToolModule for TimeModule {
    fn name(&self) -> &str {
        "time"
    }

    fn load(&self, config: &Config) -> Result<ModuleExports> {
        let configured = &config.tools.default_timezone;
        let default_zone = Zone::parse(configured)
            .ok_or_else(|| anyhow!("invalid default timezone '{}'", configured))?;

        Ok(ModuleExports::new().with_tool(GetCurrentTimeTool::to_tool(default_zone)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(tz: Option<&str>) -> GetCurrentTimeParams {
        GetCurrentTimeParams {
            timezone: tz.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_named_zone() {
        assert_eq!(
            Zone::parse("America/New_York"),
            Some(Zone::Named(chrono_tz::America::New_York))
        );
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(
            Zone::parse("-05:00"),
            Some(Zone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()))
        );
        assert_eq!(
            Zone::parse("+05:30"),
            Some(Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()))
        );
        assert_eq!(Zone::parse("+0530"), None);
        assert_eq!(Zone::parse("+aa:bb"), None);
        assert_eq!(Zone::parse("+30:00"), None);
        assert_eq!(Zone::parse("+05:60"), None);
        assert_eq!(Zone::parse("+05:30:00"), None);
    }

    #[test]
    fn test_huge_offsets_are_rejected() {
        assert_eq!(Zone::parse("+999999:00"), None);
        assert_eq!(Zone::parse("+00:99999999"), None);
        assert_eq!(Zone::parse("-4294967296:00"), None);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(Zone::parse("utc"), Some(Zone::Named(chrono_tz::Tz::UTC)));
        assert_eq!(
            Zone::parse("europe/london"),
            Some(Zone::Named(chrono_tz::Europe::London))
        );
        assert_eq!(
            Zone::parse("AMERICA/NEW_YORK"),
            Some(Zone::Named(chrono_tz::America::New_York))
        );
    }

    #[tokio::test]
    async fn test_huge_offset_is_in_band_through_dispatch() {
        use crate::domains::tools::{Dispatcher, ToolContext};
        use serde_json::json;
        use std::sync::Arc;

        let mut context = ToolContext::new();
        context
            .registry_mut()
            .register(GetCurrentTimeTool::to_tool(Zone::parse("UTC").unwrap()), "time");
        let dispatcher = Dispatcher::new(Arc::new(context));

        for tz in ["+999999:00", "+00:99999999"] {
            let arguments = json!({ "timezone": tz }).as_object().cloned().unwrap();
            let result = dispatcher.execute(GetCurrentTimeTool::NAME, arguments).await.unwrap();
            assert!(result.starts_with("Error: Invalid timezone"), "{result}");
        }
    }

    #[test]
    fn test_format_fixed_instant() {
        let instant = Utc.with_ymd_and_hms(2025, 7, 17, 20, 5, 0).unwrap();
        let zone = Zone::parse("-05:00").unwrap();
        assert_eq!(zone.format(instant), "2025-07-17T15:05:00.000000-05:00");

        let utc = Zone::parse("UTC").unwrap();
        assert_eq!(utc.format(instant), "2025-07-17T20:05:00.000000+00:00");
    }

    #[test]
    fn test_invalid_timezone_is_in_band() {
        let utc = Zone::parse("UTC").unwrap();
        let result = GetCurrentTimeTool::execute(&params(Some("Invalid/Zone")), utc);
        assert!(result.starts_with("Error: Invalid timezone 'Invalid/Zone'"));
    }

    #[test]
    fn test_default_zone_used_when_absent_or_empty() {
        let zone = Zone::parse("+02:00").unwrap();
        assert!(GetCurrentTimeTool::execute(&params(None), zone).ends_with("+02:00"));
        assert!(GetCurrentTimeTool::execute(&params(Some("")), zone).ends_with("+02:00"));
    }

    #[test]
    fn test_requested_offset_wins_over_default() {
        let zone = Zone::parse("UTC").unwrap();
        let result = GetCurrentTimeTool::execute(&params(Some("-03:30")), zone);
        assert!(result.ends_with("-03:30"));
        assert!(DateTime::parse_from_rfc3339(&result).is_ok());
    }

    #[test]
    fn test_module_exports_single_tool() {
        let exports = TimeModule.load(&Config::default()).unwrap();
        let tool = exports.tool.expect("time module exports a tool");
        assert_eq!(tool.name(), GetCurrentTimeTool::NAME);
        assert!(tool.descriptor().schema().required().is_empty());
        assert!(exports.on_startup.is_none());
    }

    #[test]
    fn test_module_rejects_invalid_default() {
        let mut config = Config::default();
        config.tools.default_timezone = "Mars/Olympus_Mons".to_string();
        let err = TimeModule.load(&config).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }
}
