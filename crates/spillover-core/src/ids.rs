use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use parking_lot::Mutex;

/// Internal row identifier. Assigned by the store at creation, never reused.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(i64);

impl MemberId {
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible member code (`MEM...`). Unique and immutable.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberCode(String);

impl MemberCode {
    pub const PREFIX: &'static str = "MEM";

    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MemberCode {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl AsRef<str> for MemberCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Issues `MEM<unix millis>` codes, strictly increasing within the process.
///
/// Two registrations in the same millisecond get consecutive values instead
/// of the same code.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    last: Mutex<i64>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_code(&self) -> MemberCode {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.lock();
        let value = if now > *last { now } else { *last + 1 };
        *last = value;
        MemberCode(format!("{}{value}", MemberCode::PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_prefix() {
        let code = CodeGenerator::new().next_code();
        assert!(code.as_str().starts_with("MEM"), "got: {code}");
        assert!(code.as_str()[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn codes_are_unique_within_a_millisecond() {
        let generator = CodeGenerator::new();
        let codes: Vec<MemberCode> = (0..500).map(|_| generator.next_code()).collect();
        let mut deduped = codes.clone();
        deduped.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn codes_are_monotonic() {
        let generator = CodeGenerator::new();
        let values: Vec<i64> = (0..100)
            .map(|_| generator.next_code().as_str()[3..].parse().unwrap())
            .collect();
        for w in values.windows(2) {
            assert!(w[0] < w[1], "not monotonic: {} >= {}", w[0], w[1]);
        }
    }

    #[test]
    fn member_code_serializes_transparently() {
        let code = MemberCode::from_raw("MEM1");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"MEM1\"");
        let id = MemberId::from_raw(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }
}
