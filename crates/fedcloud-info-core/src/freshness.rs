// crates/fedcloud-info-core/src/freshness.rs
// ============================================================================
// Module: Document Freshness
// Description: Creation-time parsing and validity window checks.
// Purpose: Reject site documents published past their validity window.
// Dependencies: time
// ============================================================================

//! ## Overview
//! A service record declares when it was generated (`CreationTime`) and for
//! how many seconds it stays valid (`Validity`). A document is stale once the
//! current instant is strictly later than `CreationTime + Validity`.
//! Timestamps without a UTC offset are interpreted as UTC.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Iso8601;
use time::format_description::well_known::Rfc3339;

use crate::glue::ServiceRecord;
use crate::normalize::NormalizeError;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an ISO 8601 creation timestamp, assuming UTC when no offset is given.
///
/// # Errors
///
/// Returns [`NormalizeError::Validation`] when the timestamp is malformed.
pub fn parse_creation_time(raw: &str) -> Result<OffsetDateTime, NormalizeError> {
    let raw = raw.trim();
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(instant);
    }
    if let Ok(instant) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Ok(instant);
    }
    PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|err| NormalizeError::Validation(format!("invalid CreationTime {raw}: {err}")))
}

// ============================================================================
// SECTION: Validity Window
// ============================================================================

/// Checks the validity window of a service record against `now`.
///
/// # Errors
///
/// Returns [`NormalizeError::Validation`] when `CreationTime` or `Validity`
/// is missing or malformed, and [`NormalizeError::Stale`] when the window
/// has elapsed.
pub fn check_freshness(service: &ServiceRecord, now: OffsetDateTime) -> Result<(), NormalizeError> {
    let creation = service
        .creation_time
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| NormalizeError::Validation("service is missing CreationTime".to_string()))?;
    let validity = service
        .validity
        .ok_or_else(|| NormalizeError::Validation("service is missing Validity".to_string()))?;
    let created = parse_creation_time(creation)?;
    let seconds = i64::try_from(validity)
        .map_err(|_| NormalizeError::Validation(format!("Validity out of range: {validity}")))?;
    let valid_until = created
        .checked_add(Duration::seconds(seconds))
        .ok_or_else(|| NormalizeError::Validation(format!("Validity out of range: {validity}")))?;
    if now > valid_until {
        let rendered = valid_until.format(&Rfc3339).unwrap_or_else(|_| valid_until.to_string());
        return Err(NormalizeError::Stale(rendered));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use time::Duration;
    use time::macros::datetime;

    use super::check_freshness;
    use super::parse_creation_time;
    use crate::glue::ServiceRecord;
    use crate::normalize::NormalizeError;

    fn service(creation: Option<&str>, validity: Option<u64>) -> ServiceRecord {
        ServiceRecord {
            creation_time: creation.map(str::to_string),
            validity,
            ..ServiceRecord::default()
        }
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let parsed = parse_creation_time("2025-05-08T15:07:06.423857").unwrap();
        assert_eq!(parsed.unix_timestamp(), datetime!(2025-05-08 15:07:06 UTC).unix_timestamp());
    }

    #[test]
    fn offsets_are_honored() {
        let parsed = parse_creation_time("2025-05-08T17:07:06+02:00").unwrap();
        assert_eq!(parsed, datetime!(2025-05-08 15:07:06 UTC));
    }

    #[test]
    fn inside_window_is_fresh() {
        let record = service(Some("2025-05-08T15:00:00"), Some(3600));
        check_freshness(&record, datetime!(2025-05-08 15:59:59 UTC)).unwrap();
        check_freshness(&record, datetime!(2025-05-08 16:00:00 UTC)).unwrap();
    }

    #[test]
    fn past_window_is_stale() {
        let record = service(Some("2025-05-08T15:00:00"), Some(3600));
        let now = datetime!(2025-05-08 16:00:00 UTC) + Duration::seconds(1);
        let err = check_freshness(&record, now).unwrap_err();
        assert!(matches!(err, NormalizeError::Stale(_)));
    }

    #[test]
    fn missing_fields_are_invalid() {
        let now = datetime!(2025-05-08 15:00:00 UTC);
        assert!(matches!(
            check_freshness(&service(None, Some(10)), now),
            Err(NormalizeError::Validation(_))
        ));
        assert!(matches!(
            check_freshness(&service(Some("2025-05-08T15:00:00"), None), now),
            Err(NormalizeError::Validation(_))
        ));
        assert!(matches!(
            check_freshness(&service(Some("yesterday"), Some(10)), now),
            Err(NormalizeError::Validation(_))
        ));
    }
}
