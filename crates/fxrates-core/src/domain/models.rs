use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, RateDate, ValidationError};

/// Normalize the feed's comma-decimal text to the canonical dot form.
/// Idempotent: already-normalized values pass through unchanged.
pub fn normalize_decimal(value: &str) -> String {
    value.trim().replace(',', ".")
}

/// One currency's published rate for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub code: CurrencyCode,
    /// How many units of the currency the value prices (e.g. 100 for JPY).
    pub nominal: i64,
    pub name: String,
    /// Dot-decimal text, e.g. "75.0000".
    pub value: String,
    pub date: RateDate,
}

impl RateEntry {
    pub fn new(
        code: CurrencyCode,
        nominal: i64,
        name: impl Into<String>,
        value: impl AsRef<str>,
        date: RateDate,
    ) -> Result<Self, ValidationError> {
        if nominal <= 0 {
            return Err(ValidationError::NominalNotPositive { nominal });
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyRateName);
        }

        Ok(Self {
            code,
            nominal,
            name,
            value: normalize_decimal(value.as_ref()),
            date,
        })
    }
}

/// Everything the source published for one date, in document order.
///
/// The feed format does not promise one entry per code; lookups take the
/// first match. A snapshot lives only for the call that produced it unless
/// it is explicitly persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: RateDate,
    pub entries: Vec<RateEntry>,
}

impl Snapshot {
    pub fn new(date: RateDate, entries: Vec<RateEntry>) -> Self {
        Self { date, entries }
    }

    /// First entry for the code, if the source published one. Codes are
    /// normalized on construction, so this is a plain equality scan.
    pub fn find(&self, code: &CurrencyCode) -> Option<&RateEntry> {
        self.entries.iter().find(|entry| &entry.code == code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> RateDate {
        RateDate::parse("01/03/2024").expect("valid date")
    }

    fn entry(code: &str, value: &str) -> RateEntry {
        RateEntry::new(
            CurrencyCode::parse(code).expect("valid code"),
            1,
            format!("{code} unit"),
            value,
            day(),
        )
        .expect("valid entry")
    }

    #[test]
    fn normalize_decimal_is_idempotent() {
        assert_eq!(normalize_decimal("75,0000"), "75.0000");
        assert_eq!(normalize_decimal("75.0000"), "75.0000");
        assert_eq!(
            normalize_decimal(&normalize_decimal("75,0000")),
            "75.0000"
        );
    }

    #[test]
    fn entry_constructor_normalizes_value() {
        let entry = entry("USD", "91,1234");
        assert_eq!(entry.value, "91.1234");
    }

    #[test]
    fn entry_rejects_non_positive_nominal() {
        let result = RateEntry::new(
            CurrencyCode::parse("USD").expect("valid code"),
            0,
            "US Dollar",
            "91.1234",
            day(),
        );
        assert_eq!(
            result,
            Err(ValidationError::NominalNotPositive { nominal: 0 })
        );
    }

    #[test]
    fn find_returns_first_match_in_document_order() {
        let first = entry("EUR", "99.0001");
        let duplicate = entry("EUR", "98.0002");
        let snapshot = Snapshot::new(day(), vec![entry("USD", "91.0"), first.clone(), duplicate]);

        let eur = CurrencyCode::parse("eur").expect("valid code");
        assert_eq!(snapshot.find(&eur), Some(&first));
    }

    #[test]
    fn find_misses_absent_code() {
        let snapshot = Snapshot::new(day(), vec![entry("USD", "91.0")]);
        let xyz = CurrencyCode::parse("XYZ").expect("valid code");
        assert!(snapshot.find(&xyz).is_none());
    }
}
