//! # Filename Grammar
//!
//! Pure classification and validation of response-file names. Two families
//! are recognized: a *special* family (`{start}{yyyymmdd}-{end}.zip`) and a
//! *general* family (`{start}{yyyymmdd}-{nnnn}[-R].zip`, where the `-R`
//! marker flags a reversal). The grammar tokens come from configuration;
//! everything here is deterministic over its inputs and performs no I/O.
//!
//! Validators take the evaluation date as an argument so callers (and tests)
//! control the clock; an embedded date in the future fails validation
//! exactly like a malformed name, with only the logged reason differing.

use crate::config::NamingConfig;
use crate::constants::FileFamily;
use chrono::NaiveDate;
use regex::Regex;

/// Extension all inbound compressed files carry.
const ZIP_EXTENSION: &str = ".zip";

/// Classification outcome for one filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Special,
    General,
    GeneralReversal,
    Invalid,
}

impl FileKind {
    /// The persisted family token, when the name classified at all.
    pub fn family(&self) -> Option<FileFamily> {
        match self {
            FileKind::Special => Some(FileFamily::Especial),
            FileKind::General => Some(FileFamily::General),
            FileKind::GeneralReversal => Some(FileFamily::GeneralReintegro),
            FileKind::Invalid => None,
        }
    }
}

/// Compiled filename grammar for both configured families.
#[derive(Debug, Clone)]
pub struct NameGrammar {
    special_prefix: String,
    general_prefix: String,
    reversal_marker: String,
    special_structure: Regex,
    general_structure: Regex,
    date_token: Regex,
    sequence_token: Regex,
}

impl NameGrammar {
    /// Compile the grammar from configuration tokens.
    ///
    /// Pattern compilation can only fail if a configured token injects an
    /// invalid escape, which is a configuration error by definition.
    pub fn new(config: &NamingConfig) -> Result<Self, regex::Error> {
        let special_structure = Regex::new(&format!(
            "^{}(\\d{{8}})-{}$",
            regex::escape(&config.especial.start),
            regex::escape(&config.especial.end),
        ))?;
        let general_structure = Regex::new(&format!(
            "^{}(\\d{{8}})-(\\d{{4}})({})?$",
            regex::escape(&config.general.start),
            regex::escape(&config.reversal_marker),
        ))?;

        Ok(Self {
            special_prefix: config.especial.prefix.clone(),
            general_prefix: config.general.prefix.clone(),
            reversal_marker: config.reversal_marker.clone(),
            special_structure,
            general_structure,
            date_token: Regex::new(r"(\d{8})-")?,
            sequence_token: Regex::new(r"-(\d{4})")?,
        })
    }

    /// Classify a filename into one of the two families, the reversal
    /// variant, or `Invalid`. Classification is by prefix and reversal
    /// marker only; structural validation is a separate, stricter check.
    pub fn classify(&self, filename: &str) -> FileKind {
        if filename.starts_with(&self.special_prefix) {
            return FileKind::Special;
        }
        if filename.starts_with(&self.general_prefix) {
            let stem = Self::strip_extension(filename);
            if stem.ends_with(&self.reversal_marker) {
                return FileKind::GeneralReversal;
            }
            return FileKind::General;
        }
        FileKind::Invalid
    }

    /// Validate a special-family name structurally and temporally.
    pub fn validate_special_structure(&self, filename: &str, today: NaiveDate) -> bool {
        let stem = Self::strip_extension(filename);
        match self.special_structure.captures(stem) {
            Some(caps) => Self::date_not_in_future(&caps[1], today),
            None => false,
        }
    }

    /// Validate a general-family name structurally and temporally. The
    /// reversal marker is accepted as an optional tail.
    pub fn validate_general_structure(&self, filename: &str, today: NaiveDate) -> bool {
        let stem = Self::strip_extension(filename);
        match self.general_structure.captures(stem) {
            Some(caps) => Self::date_not_in_future(&caps[1], today),
            None => false,
        }
    }

    /// Extract the embedded eight-digit date, when one is present and
    /// parses as a real calendar date. Absence is not an error.
    pub fn extract_date(&self, filename: &str) -> Option<NaiveDate> {
        let caps = self.date_token.captures(filename)?;
        NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
    }

    /// Extract the four-digit sequence token, when one is present.
    pub fn extract_sequence(&self, filename: &str) -> Option<String> {
        self.sequence_token
            .captures(filename)
            .map(|caps| caps[1].to_string())
    }

    /// Canonical archivo name: the matched family prefix and the `.zip`
    /// extension removed. Names matching neither prefix lose only the
    /// extension; this is total and never fails.
    pub fn strip_prefix_and_extension(&self, filename: &str) -> String {
        let stem = Self::strip_extension(filename);
        if let Some(rest) = stem.strip_prefix(self.special_prefix.as_str()) {
            return rest.to_string();
        }
        if let Some(rest) = stem.strip_prefix(self.general_prefix.as_str()) {
            return rest.to_string();
        }
        stem.to_string()
    }

    fn strip_extension(filename: &str) -> &str {
        filename.strip_suffix(ZIP_EXTENSION).unwrap_or(filename)
    }

    fn date_not_in_future(token: &str, today: NaiveDate) -> bool {
        match NaiveDate::parse_from_str(token, "%Y%m%d") {
            Ok(date) => date <= today,
            Err(_) => false,
        }
    }
}
