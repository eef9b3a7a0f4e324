//! Decoding of the feed's daily-rates XML document.
//!
//! The body arrives as raw bytes in whatever charset the XML declaration
//! names (the feed publishes windows-1251); it is transcoded to UTF-8
//! before structural parsing, then validated into domain entries.

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::rate_source::SourceError;
use crate::{CurrencyCode, RateDate, RateEntry, Snapshot};

#[derive(Debug, Deserialize)]
struct ValCursPayload {
    #[serde(rename = "Valute", default)]
    valutes: Vec<ValutePayload>,
}

#[derive(Debug, Deserialize)]
struct ValutePayload {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: i64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Transcode and parse one feed document into a snapshot for `date`.
pub fn decode_snapshot(body: &[u8], date: RateDate) -> Result<Snapshot, SourceError> {
    let text = transcode(body)?;
    let payload: ValCursPayload = quick_xml::de::from_str(&text)
        .map_err(|error| SourceError::decode(format!("malformed feed document: {error}")))?;

    let entries = payload
        .valutes
        .into_iter()
        .map(|valute| {
            let code = CurrencyCode::parse(&valute.char_code)
                .map_err(|error| SourceError::decode(format!("bad feed entry: {error}")))?;
            RateEntry::new(code, valute.nominal, valute.name, &valute.value, date)
                .map_err(|error| SourceError::decode(format!("bad feed entry: {error}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot::new(date, entries))
}

fn transcode(body: &[u8]) -> Result<String, SourceError> {
    let encoding = declared_encoding(body).unwrap_or(encoding_rs::UTF_8);
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(SourceError::decode(format!(
            "body is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Charset named by the XML declaration, if any. The declaration itself is
/// ASCII in every encoding the feed uses, so a lossy scan of the prefix is
/// enough to read the label.
fn declared_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let prefix = &body[..body.len().min(256)];
    let prefix = String::from_utf8_lossy(prefix);
    let declaration = prefix.split("?>").next()?;
    if !declaration.contains("<?xml") {
        return None;
    }

    let after = declaration.split("encoding=").nth(1)?;
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let label = after[1..].split(quote).next()?;
    Encoding::for_label(label.as_bytes())
}
