use std::fmt;

use crate::patterns::{has_long_digit_run, ADDRESS_MARKERS};

/// Why a response was refused by the write guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PiiViolation {
    LongDigitRun,
    AddressKeyword(&'static str),
}

impl fmt::Display for PiiViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongDigitRun => f.write_str("long digit run"),
            Self::AddressKeyword(keyword) => write!(f, "address keyword `{keyword}`"),
        }
    }
}

/// Blocks responses carrying personal data from entering the shared cache.
#[derive(Clone, Debug, Default)]
pub struct PiiGuard;

impl PiiGuard {
    pub fn check(&self, response: &str) -> Result<(), PiiViolation> {
        if has_long_digit_run(response) {
            return Err(PiiViolation::LongDigitRun);
        }
        let normalized = response.to_lowercase();
        if let Some(keyword) = ADDRESS_MARKERS.iter().find(|keyword| normalized.contains(**keyword))
        {
            return Err(PiiViolation::AddressKeyword(*keyword));
        }
        Ok(())
    }
}
