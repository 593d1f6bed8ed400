//! Acceptance rules for scanned codes.

use thiserror::Error;

/// Longest accepted station code, in characters.
pub const MAX_STATION_CODE_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Station code is longer than {MAX_STATION_CODE_LEN} characters")]
    StationTooLong,

    #[error("Station code may only contain letters, digits and spaces")]
    StationInvalidCharacters,

    #[error("Merchandise code is empty")]
    MerchandiseEmpty,

    #[error("Merchandise code may only contain letters and digits")]
    MerchandiseInvalidCharacters,

    #[error("Merchandise code matches the station code")]
    MerchandiseMatchesStation,

    #[error("Selection is missing the {0}")]
    IncompleteSelection(&'static str),

    #[error("No station has been scanned yet")]
    NoStation,
}

/// Letters of any script and ASCII decimal digits. Numeric letters and
/// fractions or superscripts (`Ⅻ`, `½`, `²`) are not accepted.
fn is_letter_or_digit(c: char) -> bool {
    c.is_ascii_digit() || (c.is_alphabetic() && !c.is_numeric())
}

/// Check a station code. An empty code passes.
pub fn validate_station_code(code: &str) -> Result<(), ValidationError> {
    if code.chars().count() > MAX_STATION_CODE_LEN {
        return Err(ValidationError::StationTooLong);
    }
    if !code
        .chars()
        .all(|c| is_letter_or_digit(c) || c.is_whitespace())
    {
        return Err(ValidationError::StationInvalidCharacters);
    }
    Ok(())
}

pub fn is_valid_station_code(code: &str) -> bool {
    validate_station_code(code).is_ok()
}

/// Check a scanned merchandise code against the station of the same session.
pub fn validate_merchandise_code(code: &str, station_code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::MerchandiseEmpty);
    }
    if !code.chars().all(is_letter_or_digit) {
        return Err(ValidationError::MerchandiseInvalidCharacters);
    }
    if code == station_code {
        return Err(ValidationError::MerchandiseMatchesStation);
    }
    Ok(())
}

pub fn is_valid_merchandise_code(code: &str, station_code: &str) -> bool {
    validate_merchandise_code(code, station_code).is_ok()
}
