//! Domain types shared by search, booking and ticketing.
//!
//! Train offers serialize with the field names the train generator is asked
//! to produce (`trainNumber`, `source`, `availability`, ...), so the same
//! types read generator output and persist inside ticket snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identity
// ============================================================================

/// Opaque user identifier issued by the auth backend
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier issued by the auth backend
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend identifier
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Name shown in the UI
    pub display_name: String,
}

impl Identity {
    /// Builds an identity, falling back to the email's local part when no
    /// display name was recorded
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<&str>) -> Self {
        let email = email.into();
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(
                || email.split('@').next().unwrap_or_default().to_string(),
                ToString::to_string,
            );

        Self {
            id,
            email,
            display_name,
        }
    }
}

// ============================================================================
// Fares
// ============================================================================

/// Travel class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    /// Sleeper
    #[serde(rename = "Sleeper (SL)", alias = "SL")]
    Sleeper,
    /// AC three tier
    #[serde(rename = "AC 3 Tier (3A)", alias = "3A")]
    Ac3,
    /// AC two tier
    #[serde(rename = "AC 2 Tier (2A)", alias = "2A")]
    Ac2,
    /// AC first class
    #[serde(rename = "AC First Class (1A)", alias = "1A")]
    Ac1,
}

impl ClassType {
    /// All classes, cheapest first
    pub const ALL: [Self; 4] = [Self::Sleeper, Self::Ac3, Self::Ac2, Self::Ac1];

    /// Display label, also the wire name
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sleeper => "Sleeper (SL)",
            Self::Ac3 => "AC 3 Tier (3A)",
            Self::Ac2 => "AC 2 Tier (2A)",
            Self::Ac1 => "AC First Class (1A)",
        }
    }

    /// Short code printed on tickets
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Sleeper => "SL",
            Self::Ac3 => "3A",
            Self::Ac2 => "2A",
            Self::Ac1 => "1A",
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClassType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.label().eq_ignore_ascii_case(s) || class.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown class type: {s}"))
    }
}

/// Seat availability status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    /// Confirmed seats available
    Available,
    /// Reservation against cancellation
    Rac,
    /// Waiting list
    Waitlist,
}

impl SeatStatus {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Rac => "RAC",
            Self::Waitlist => "WAITLIST",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "RAC" => Ok(Self::Rac),
            "WAITLIST" | "WL" => Ok(Self::Waitlist),
            other => Err(format!("unknown seat status: {other}")),
        }
    }
}

// ============================================================================
// Money (whole rupees)
// ============================================================================

/// An amount in whole Indian rupees
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates an amount from rupees
    #[must_use]
    pub const fn from_rupees(rupees: u64) -> Self {
        Self(rupees)
    }

    /// Returns the amount in rupees
    #[must_use]
    pub const fn rupees(self) -> u64 {
        self.0
    }

    /// Multiplies by a head count, saturating on overflow
    #[must_use]
    pub fn times(self, count: usize) -> Self {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        Self(self.0.saturating_mul(count))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

/// One class of one train as offered by search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareClass {
    /// Travel class
    #[serde(rename = "type")]
    pub class_type: ClassType,
    /// Seats (or waitlist slots) reported by search; never decremented
    pub available: u32,
    /// Price per passenger
    pub price: Money,
    /// Availability status
    pub status: SeatStatus,
}

impl FareClass {
    /// Whether the class can be booked
    ///
    /// Only a waitlist with nothing left is closed; RAC and waitlist entries
    /// with remaining slots stay bookable.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !(self.status == SeatStatus::Waitlist && self.available == 0)
    }
}

/// A train returned by search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainOffer {
    /// Train number, e.g. `12951`
    #[serde(rename = "trainNumber")]
    pub number: String,
    /// Train name
    #[serde(rename = "trainName")]
    pub name: String,
    /// Origin station
    #[serde(rename = "source")]
    pub origin: String,
    /// Destination station
    pub destination: String,
    /// Departure time as displayed (`HH:MM`)
    pub departure_time: String,
    /// Arrival time as displayed (`HH:MM`)
    pub arrival_time: String,
    /// Journey duration as displayed (`15h 30m`)
    pub duration: String,
    /// Fare classes in the order search returned them
    #[serde(rename = "availability")]
    pub fares: Vec<FareClass>,
}

// ============================================================================
// Passengers
// ============================================================================

/// Passenger gender
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// Male
    #[default]
    Male,
    /// Female
    Female,
    /// Other
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        })
    }
}

/// Preferred berth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BerthPreference {
    /// Lower
    Lower,
    /// Middle
    Middle,
    /// Upper
    Upper,
    /// Side lower
    SideLower,
    /// Side upper
    SideUpper,
}

/// A passenger row in the booking draft, before contact details are attached
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerEntry {
    /// Full name
    pub name: String,
    /// Age in years; `0` means not filled in
    pub age: u8,
    /// Gender
    pub gender: Gender,
    /// Optional berth preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub berth_preference: Option<BerthPreference>,
}

impl PassengerEntry {
    /// Creates an entry without a berth preference
    #[must_use]
    pub fn new(name: impl Into<String>, age: u8, gender: Gender) -> Self {
        Self {
            name: name.into(),
            age,
            gender,
            berth_preference: None,
        }
    }

    /// Sets the berth preference
    #[must_use]
    pub const fn with_berth(mut self, berth: BerthPreference) -> Self {
        self.berth_preference = Some(berth);
        self
    }
}

/// A validated passenger as printed on a ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    /// Full name
    pub name: String,
    /// Age in years
    pub age: u8,
    /// Gender
    pub gender: Gender,
    /// Optional berth preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub berth_preference: Option<BerthPreference>,
    /// Contact mobile, shared by the whole booking
    pub mobile: String,
    /// Contact email, shared by the whole booking
    pub email: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let named = Identity::new(UserId::new("u1"), "asha@example.com", Some("Asha Rao"));
        assert_eq!(named.display_name, "Asha Rao");

        let blank = Identity::new(UserId::new("u2"), "ravi.k@example.com", Some("   "));
        assert_eq!(blank.display_name, "ravi.k");

        let missing = Identity::new(UserId::new("u3"), "meera@example.com", None);
        assert_eq!(missing.display_name, "meera");
    }

    #[test]
    fn class_type_accepts_labels_and_codes() {
        assert_eq!("AC 3 Tier (3A)".parse::<ClassType>().unwrap(), ClassType::Ac3);
        assert_eq!("1a".parse::<ClassType>().unwrap(), ClassType::Ac1);
        assert!("First".parse::<ClassType>().is_err());

        let short: ClassType = serde_json::from_str("\"SL\"").unwrap();
        assert_eq!(short, ClassType::Sleeper);
        assert_eq!(serde_json::to_string(&short).unwrap(), "\"Sleeper (SL)\"");
    }

    #[test]
    fn waitlist_with_no_slots_is_not_selectable() {
        let mut fare = FareClass {
            class_type: ClassType::Ac3,
            available: 0,
            price: Money::from_rupees(1600),
            status: SeatStatus::Waitlist,
        };
        assert!(!fare.is_selectable());

        fare.available = 3;
        assert!(fare.is_selectable());

        fare.available = 0;
        fare.status = SeatStatus::Rac;
        assert!(fare.is_selectable());
    }

    #[test]
    fn money_displays_in_rupees_and_saturates() {
        assert_eq!(Money::from_rupees(1900).times(2).to_string(), "₹3800");
        assert_eq!(Money::from_rupees(u64::MAX).times(2), Money::from_rupees(u64::MAX));
    }

    #[test]
    fn train_offer_uses_generator_field_names() {
        let json = serde_json::json!({
            "trainNumber": "22221",
            "trainName": "Vande Bharat Exp",
            "source": "Mumbai",
            "destination": "Gandhinagar",
            "departureTime": "06:10",
            "arrivalTime": "12:25",
            "duration": "6h 15m",
            "availability": [
                { "type": "AC 2 Tier (2A)", "available": 145, "price": 900, "status": "AVAILABLE" }
            ]
        });

        let offer: TrainOffer = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(offer.origin, "Mumbai");
        assert_eq!(offer.fares[0].class_type, ClassType::Ac2);
        assert_eq!(serde_json::to_value(&offer).unwrap(), json);
    }
}
