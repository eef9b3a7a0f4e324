mod currency;
mod date;
mod models;

pub use currency::CurrencyCode;
pub use date::RateDate;
pub use models::{normalize_decimal, RateEntry, Snapshot};
