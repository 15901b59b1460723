//! The city-chain rule.
//!
//! A pure function of the candidate text and the cities already named this
//! round. No dictionary is consulted: any non-empty string is a city as long
//! as it is new and starts with the right letter.

use crate::CityError;

/// Longest accepted city, in characters.
///
/// Every accepted city is echoed to the other members inside a chat line,
/// so the cap keeps that line far below the transport's frame limit.
pub const MAX_CITY_LEN: usize = 100;

/// Normalizes raw client input: surrounding whitespace removed, lower-cased.
pub fn normalize_city(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Checks `raw` against `chain` and returns the normalized city to append.
///
/// `chain` holds previously accepted cities, already normalized.
///
/// # Errors
/// 1. [`CityError::EmptyCity`] if nothing is left after trimming.
/// 2. [`CityError::CityTooLong`] if more than [`MAX_CITY_LEN`] characters
///    are left.
/// 3. [`CityError::CityAlreadyUsed`] if the city is already in `chain`.
/// 4. [`CityError::WrongStartingLetter`] if `chain` is non-empty and the
///    city's first character differs from the last character of the most
///    recent entry.
pub fn validate_city(raw: &str, chain: &[String]) -> Result<String, CityError> {
    let city = normalize_city(raw);

    let Some(first) = city.chars().next() else {
        return Err(CityError::EmptyCity);
    };

    if city.chars().count() > MAX_CITY_LEN {
        return Err(CityError::CityTooLong { max: MAX_CITY_LEN });
    }

    if chain.iter().any(|used| *used == city) {
        return Err(CityError::CityAlreadyUsed(city));
    }

    if let Some(expected) = chain.last().and_then(|prev| prev.chars().last()) {
        if first != expected {
            return Err(CityError::WrongStartingLetter { expected });
        }
    }

    Ok(city)
}
