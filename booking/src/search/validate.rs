//! Boundary validation of generator output.
//!
//! Model replies are untrusted text. Parsing is lenient about framing
//! (markdown fences, prose around the array) and strict about content:
//! entries that do not describe a bookable train are dropped one by one
//! instead of failing the whole reply.

use super::GeneratorError;
use crate::types::{ClassType, FareClass, Money, SeatStatus, TrainOffer};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOffer {
    train_number: String,
    train_name: String,
    source: String,
    destination: String,
    departure_time: String,
    arrival_time: String,
    duration: String,
    #[serde(default)]
    availability: Vec<Value>,
}

#[derive(Deserialize)]
struct RawFare {
    #[serde(rename = "type")]
    class_type: String,
    available: i64,
    price: f64,
    status: String,
}

/// Extract and validate the offers in a raw generator reply
///
/// # Errors
///
/// - [`GeneratorError::ResponseParseFailed`] if no JSON array can be read
/// - [`GeneratorError::NoValidOffers`] if every entry was dropped
pub fn parse_offers(raw: &str) -> Result<Vec<TrainOffer>, GeneratorError> {
    let array = extract_array(raw)
        .ok_or_else(|| GeneratorError::ResponseParseFailed("no JSON array in reply".to_string()))?;

    let entries: Vec<Value> = serde_json::from_str(array)
        .map_err(|e| GeneratorError::ResponseParseFailed(e.to_string()))?;

    let total = entries.len();
    let offers: Vec<TrainOffer> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match to_offer(entry) {
            Ok(offer) => Some(offer),
            Err(reason) => {
                tracing::debug!(index, %reason, "Dropped generated train entry");
                None
            }
        })
        .collect();

    if offers.len() < total {
        tracing::warn!(kept = offers.len(), total, "Some generated trains were invalid");
    }

    if offers.is_empty() {
        return Err(GeneratorError::NoValidOffers);
    }
    Ok(offers)
}

/// The outermost `[...]` span, ignoring fences and surrounding prose
fn extract_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (start < end).then(|| &raw[start..=end])
}

fn to_offer(entry: Value) -> Result<TrainOffer, String> {
    let raw: RawOffer = serde_json::from_value(entry).map_err(|e| e.to_string())?;

    let required = [
        ("trainNumber", &raw.train_number),
        ("trainName", &raw.train_name),
        ("source", &raw.source),
        ("destination", &raw.destination),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(format!("{field} is blank"));
    }

    let fares: Vec<FareClass> = raw
        .availability
        .into_iter()
        .filter_map(|fare| match to_fare(fare) {
            Ok(fare) => Some(fare),
            Err(reason) => {
                tracing::debug!(train = %raw.train_number, %reason, "Dropped generated fare");
                None
            }
        })
        .collect();

    if fares.is_empty() {
        return Err("no valid fare classes".to_string());
    }

    Ok(TrainOffer {
        number: raw.train_number.trim().to_string(),
        name: raw.train_name.trim().to_string(),
        origin: raw.source.trim().to_string(),
        destination: raw.destination.trim().to_string(),
        departure_time: raw.departure_time.trim().to_string(),
        arrival_time: raw.arrival_time.trim().to_string(),
        duration: raw.duration.trim().to_string(),
        fares,
    })
}

fn to_fare(value: Value) -> Result<FareClass, String> {
    let raw: RawFare = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let class_type: ClassType = raw.class_type.parse()?;
    let status: SeatStatus = raw.status.parse()?;
    let available = u32::try_from(raw.available)
        .map_err(|_| format!("invalid available count {}", raw.available))?;
    let price = rupees(raw.price)?;

    Ok(FareClass {
        class_type,
        available,
        price,
        status,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rupees(price: f64) -> Result<Money, String> {
    // u64::MAX as f64 rounds up, so stay strictly below it.
    if !price.is_finite() || price < 0.0 || price >= 1.0e15 {
        return Err(format!("invalid price {price}"));
    }
    Ok(Money::from_rupees(price.round() as u64))
}
