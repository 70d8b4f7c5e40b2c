//! Patterns that pull file and byte counts out of a transfer tool's summary.

use crate::domain::model::StatsSource;
use crate::utils::error::Result;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct PatternPair {
    primary: Regex,
    alternate: Option<Regex>,
}

impl PatternPair {
    pub fn new(primary: &str, alternate: Option<&str>) -> Result<Self> {
        Ok(Self {
            primary: Regex::new(primary)?,
            alternate: alternate.map(Regex::new).transpose()?,
        })
    }

    /// Last match of the primary pattern, else last match of the alternate.
    pub fn find(&self, text: &str) -> Option<(u64, StatsSource)> {
        last_number(&self.primary, text)
            .map(|n| (n, StatsSource::PrimaryPattern))
            .or_else(|| {
                self.alternate
                    .as_ref()
                    .and_then(|re| last_number(re, text))
                    .map(|n| (n, StatsSource::AlternatePattern))
            })
    }
}

fn last_number(re: &Regex, text: &str) -> Option<u64> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_count(m.as_str()))
        .last()
}

/// Parses integers printed with thousands separators ("1,234,567").
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ',' | '.' | '_')).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone)]
pub struct StatsPatterns {
    pub files: PatternPair,
    pub bytes: PatternPair,
}

impl StatsPatterns {
    /// Patterns for the summary block printed by `rsync --stats`.
    pub fn rsync() -> Result<Self> {
        Ok(Self {
            files: PatternPair::new(
                r"Number of regular files transferred:\s*([\d,.]+)",
                Some(r"Number of files transferred:\s*([\d,.]+)"),
            )?,
            bytes: PatternPair::new(
                r"Total transferred file size:\s*([\d,.]+)\s*bytes",
                Some(r"(?m)^sent\s+([\d,.]+)\s+bytes"),
            )?,
        })
    }

    /// Patterns for the summary printed by `lftp mirror --verbose`.
    pub fn lftp() -> Result<Self> {
        Ok(Self {
            files: PatternPair::new(
                r"New:\s*(\d+)\s+files?",
                Some(r"Total:\s*\d+\s+director(?:y|ies),\s*(\d+)\s+files?"),
            )?,
            bytes: PatternPair::new(r"([\d,]+)\s+bytes transferred", None)?,
        })
    }
}
