//! Splitting raw waybill strings into prefix and serial number.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Three-digit prefix, optional separator, eight-digit serial. Unanchored on
/// purpose: a waybill embedded in surrounding text still matches. Digits are
/// ASCII only.
static RE_WAYBILL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{3})[-\s]?([0-9]{8})").unwrap());

/// A waybill identifier split into its two lookup parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaybillKey {
    pub prefix: String,
    pub number: String,
}

impl WaybillKey {
    pub fn new(prefix: &str, number: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            number: number.to_string(),
        }
    }
}

impl fmt::Display for WaybillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.number)
    }
}

/// Parses a raw identifier into a [`WaybillKey`].
///
/// Surrounding whitespace is trimmed and inner spaces removed. A value with
/// exactly one hyphen and two non-empty halves is taken verbatim. Anything
/// else falls back to the first `PPP[-]NNNNNNNN` digit run found in the
/// string. `None` means the row should be skipped without a lookup.
pub fn split_waybill(raw: &str) -> Option<WaybillKey> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ' ').collect();

    let parts: Vec<&str> = cleaned.split('-').collect();
    if let [prefix, number] = parts.as_slice() {
        if !prefix.is_empty() && !number.is_empty() {
            return Some(WaybillKey::new(prefix, number));
        }
    }

    RE_WAYBILL
        .captures(&cleaned)
        .map(|caps| WaybillKey::new(&caps[1], &caps[2]))
}
