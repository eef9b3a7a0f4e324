use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// `DD/MM/YYYY`, the canonical textual form the feed publishes and accepts.
const FEED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year]");

/// Calendar date a rate applies to.
///
/// Renders as the feed's `DD/MM/YYYY` form; [`RateDate::sql`] gives the ISO
/// form the store keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RateDate(Date);

impl RateDate {
    /// Parse the feed's `DD/MM/YYYY` form. Anything else, including ISO
    /// dates, is a client-input error.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input.trim(), FEED_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    pub fn from_date(date: Date) -> Self {
        Self(date)
    }

    /// Today as seen from a fixed UTC offset. The request path and the
    /// daily sync both use the feed's offset so "today" is deterministic
    /// regardless of where the process runs.
    pub fn today_at_offset(offset: UtcOffset) -> Self {
        Self(OffsetDateTime::now_utc().to_offset(offset).date())
    }

    /// The feed's `DD/MM/YYYY` form.
    pub fn feed(&self) -> String {
        self.to_string()
    }

    /// ISO `YYYY-MM-DD`, the form the store keys on.
    pub fn sql(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }

    pub fn inner(&self) -> Date {
        self.0
    }
}

impl Display for RateDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:04}",
            self.0.day(),
            u8::from(self.0.month()),
            self.0.year()
        )
    }
}

impl TryFrom<String> for RateDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RateDate> for String {
    fn from(value: RateDate) -> Self {
        value.feed()
    }
}
