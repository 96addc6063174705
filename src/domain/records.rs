use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// The carrier's priced offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote_id: String,
    pub premium_amount: Decimal,
    /// Opaque coverage payload, kept exactly as the carrier sent it.
    #[serde(default)]
    pub coverage_details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
}

/// The carrier's reference to a tokenized payment instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodRecord {
    pub payment_method_id: String,
    pub quote_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four: Option<String>,
}

/// A bound policy; the terminal record of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policy_number: String,
    pub policy_id: String,
    #[serde(deserialize_with = "carrier_date")]
    pub effective_date: NaiveDate,
    pub premium_amount: Decimal,
    /// Dropped rather than rejected when the carrier sends an unreadable value.
    #[serde(
        default,
        deserialize_with = "optional_carrier_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Reads the calendar date out of a plain date, an RFC 3339 timestamp, or a
/// naive `T`-separated datetime.
fn parse_carrier_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn carrier_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_carrier_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date '{raw}'")))
}

fn optional_carrier_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_carrier_date))
}
