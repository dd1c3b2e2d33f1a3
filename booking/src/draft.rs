//! Booking draft: passenger rows and contact details for a chosen fare.

use crate::types::{ClassType, FareClass, Passenger, PassengerEntry, TrainOffer};
use thiserror::Error;

/// Maximum passengers on one ticket
pub const MAX_PASSENGERS: usize = 6;

/// Oldest accepted passenger age
pub const MAX_AGE: u8 = 120;

/// Draft errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// Waitlisted class with no slots left
    #[error("{0} is not available for booking")]
    NotSelectable(ClassType),

    /// Passenger limit reached
    #[error("A booking can have at most {max} passengers")]
    TooManyPassengers {
        /// The limit
        max: usize,
    },

    /// Removing the only passenger row
    #[error("A booking needs at least one passenger")]
    LastPassenger,

    /// Index out of range
    #[error("No passenger at position {0}")]
    UnknownPassenger(usize),

    /// Name or age missing
    #[error("Passenger {}: {reason}", .index + 1)]
    InvalidPassenger {
        /// Zero-based row
        index: usize,
        /// What is wrong
        reason: String,
    },

    /// Mobile or email missing
    #[error("Contact mobile and email are required")]
    MissingContact,
}

/// A train and one of its selectable fare classes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    train: TrainOffer,
    fare: FareClass,
}

impl Selection {
    /// Pairs a train with a fare
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::NotSelectable`] for a waitlisted class with no
    /// slots left.
    pub fn new(train: TrainOffer, fare: FareClass) -> Result<Self, DraftError> {
        if !fare.is_selectable() {
            return Err(DraftError::NotSelectable(fare.class_type));
        }
        Ok(Self { train, fare })
    }

    /// Selected train
    #[must_use]
    pub const fn train(&self) -> &TrainOffer {
        &self.train
    }

    /// Selected fare
    #[must_use]
    pub const fn fare(&self) -> &FareClass {
        &self.fare
    }

    /// Splits into the snapshots a ticket keeps
    #[must_use]
    pub fn into_parts(self) -> (TrainOffer, FareClass) {
        (self.train, self.fare)
    }
}

/// Contact details shared by every passenger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contact {
    /// Mobile number
    pub mobile: String,
    /// Email address
    pub email: String,
}

/// Passenger rows being filled in for a selection
///
/// Starts with one blank row. Rows are only validated by [`BookingDraft::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDraft {
    selection: Selection,
    passengers: Vec<PassengerEntry>,
    contact: Contact,
}

impl BookingDraft {
    /// Starts a draft with a single blank passenger
    #[must_use]
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            passengers: vec![PassengerEntry::default()],
            contact: Contact::default(),
        }
    }

    /// The fare being booked
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current passenger rows
    #[must_use]
    pub fn passengers(&self) -> &[PassengerEntry] {
        &self.passengers
    }

    /// Current contact details
    #[must_use]
    pub const fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Appends a blank passenger row and returns its index
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::TooManyPassengers`] when the draft is full.
    pub fn add_passenger(&mut self) -> Result<usize, DraftError> {
        if self.passengers.len() >= MAX_PASSENGERS {
            return Err(DraftError::TooManyPassengers { max: MAX_PASSENGERS });
        }
        self.passengers.push(PassengerEntry::default());
        Ok(self.passengers.len() - 1)
    }

    /// Removes a passenger row
    ///
    /// # Errors
    ///
    /// - [`DraftError::UnknownPassenger`] for an out-of-range index
    /// - [`DraftError::LastPassenger`] when only one row is left
    pub fn remove_passenger(&mut self, index: usize) -> Result<(), DraftError> {
        if index >= self.passengers.len() {
            return Err(DraftError::UnknownPassenger(index));
        }
        if self.passengers.len() == 1 {
            return Err(DraftError::LastPassenger);
        }
        self.passengers.remove(index);
        Ok(())
    }

    /// Replaces a passenger row
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::UnknownPassenger`] for an out-of-range index.
    pub fn update_passenger(&mut self, index: usize, entry: PassengerEntry) -> Result<(), DraftError> {
        let row = self
            .passengers
            .get_mut(index)
            .ok_or(DraftError::UnknownPassenger(index))?;
        *row = entry;
        Ok(())
    }

    /// Sets the contact details
    pub fn set_contact(&mut self, mobile: impl Into<String>, email: impl Into<String>) {
        self.contact = Contact {
            mobile: mobile.into(),
            email: email.into(),
        };
    }

    /// Validates every row and the contact details, then copies the contact
    /// onto each passenger
    ///
    /// # Errors
    ///
    /// - [`DraftError::InvalidPassenger`] for the first row with a blank name
    ///   or an age outside `1..=120`
    /// - [`DraftError::MissingContact`] if mobile or email is blank
    pub fn submit(&self) -> Result<Vec<Passenger>, DraftError> {
        for (index, entry) in self.passengers.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(DraftError::InvalidPassenger {
                    index,
                    reason: "name is required".to_string(),
                });
            }
            if entry.age == 0 || entry.age > MAX_AGE {
                return Err(DraftError::InvalidPassenger {
                    index,
                    reason: format!("age must be between 1 and {MAX_AGE}"),
                });
            }
        }

        let mobile = self.contact.mobile.trim();
        let email = self.contact.email.trim();
        if mobile.is_empty() || email.is_empty() {
            return Err(DraftError::MissingContact);
        }

        Ok(self
            .passengers
            .iter()
            .map(|entry| Passenger {
                name: entry.name.trim().to_string(),
                age: entry.age,
                gender: entry.gender,
                berth_preference: entry.berth_preference,
                mobile: mobile.to_string(),
                email: email.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::search::fallback::fallback_offers;
    use crate::types::Gender;

    fn draft() -> BookingDraft {
        let train = fallback_offers().remove(0);
        let fare = train.fares[0].clone();
        BookingDraft::new(Selection::new(train, fare).unwrap())
    }

    #[test]
    fn waitlist_without_slots_cannot_be_selected() {
        let train = fallback_offers().remove(1);
        let closed = train.fares[1].clone();
        assert_eq!(
            Selection::new(train, closed),
            Err(DraftError::NotSelectable(ClassType::Ac3))
        );
    }

    #[test]
    fn passenger_rows_stay_between_one_and_six() {
        let mut draft = draft();
        assert_eq!(draft.passengers().len(), 1);
        assert_eq!(draft.remove_passenger(0), Err(DraftError::LastPassenger));

        for expected in 1..MAX_PASSENGERS {
            assert_eq!(draft.add_passenger().unwrap(), expected);
        }
        assert_eq!(
            draft.add_passenger(),
            Err(DraftError::TooManyPassengers { max: 6 })
        );

        draft.remove_passenger(3).unwrap();
        assert_eq!(draft.passengers().len(), 5);
        assert_eq!(draft.remove_passenger(9), Err(DraftError::UnknownPassenger(9)));
    }

    #[test]
    fn zero_age_is_rejected() {
        let mut draft = draft();
        draft
            .update_passenger(0, PassengerEntry::new("Asha", 0, Gender::Female))
            .unwrap();
        draft.set_contact("9876543210", "asha@example.com");

        let err = draft.submit().unwrap_err();
        assert!(matches!(err, DraftError::InvalidPassenger { index: 0, .. }));
        assert_eq!(err.to_string(), "Passenger 1: age must be between 1 and 120");
    }

    #[test]
    fn blank_name_and_missing_contact_are_rejected() {
        let mut draft = draft();
        draft
            .update_passenger(0, PassengerEntry::new("  ", 40, Gender::Male))
            .unwrap();
        assert!(matches!(
            draft.submit(),
            Err(DraftError::InvalidPassenger { index: 0, .. })
        ));

        draft
            .update_passenger(0, PassengerEntry::new("Ravi", 40, Gender::Male))
            .unwrap();
        draft.set_contact("9876543210", " ");
        assert_eq!(draft.submit(), Err(DraftError::MissingContact));
    }

    #[test]
    fn contact_is_copied_onto_every_passenger() {
        let mut draft = draft();
        draft.add_passenger().unwrap();
        draft
            .update_passenger(0, PassengerEntry::new(" Asha ", 31, Gender::Female))
            .unwrap();
        draft
            .update_passenger(1, PassengerEntry::new("Ravi", 120, Gender::Male))
            .unwrap();
        draft.set_contact("9876543210", "asha@example.com");

        let passengers = draft.submit().unwrap();
        assert_eq!(passengers.len(), 2);
        assert_eq!(passengers[0].name, "Asha");
        assert!(passengers
            .iter()
            .all(|p| p.mobile == "9876543210" && p.email == "asha@example.com"));
    }
}
