//! Property tests for fares, drafts and tickets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use railconnect::draft::{BookingDraft, DraftError, Selection, MAX_PASSENGERS};
use railconnect::search::fallback::fallback_offers;
use railconnect::search::validate::parse_offers;
use railconnect::ticket::TicketError;
use railconnect::{
    BookingStatus, ClassType, FareClass, Gender, Money, PassengerEntry, Pnr, SeatStatus, Ticket,
    TrainOffer,
};

// ────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────

fn arb_status() -> impl Strategy<Value = SeatStatus> {
    prop_oneof![
        Just(SeatStatus::Available),
        Just(SeatStatus::Rac),
        Just(SeatStatus::Waitlist),
    ]
}

fn arb_class() -> impl Strategy<Value = ClassType> {
    prop_oneof![
        Just(ClassType::Sleeper),
        Just(ClassType::Ac3),
        Just(ClassType::Ac2),
        Just(ClassType::Ac1),
    ]
}

fn arb_fare() -> impl Strategy<Value = FareClass> {
    (arb_class(), 0u32..300, 0u64..100_000, arb_status()).prop_map(
        |(class_type, available, price, status)| FareClass {
            class_type,
            available,
            price: Money::from_rupees(price),
            status,
        },
    )
}

fn arb_passenger() -> impl Strategy<Value = PassengerEntry> {
    ("[A-Z][a-z]{1,10} [A-Z][a-z]{1,10}", 1u8..=120).prop_map(|(name, age)| {
        PassengerEntry::new(name, age, Gender::Other)
    })
}

fn train_with(fare: FareClass) -> TrainOffer {
    let mut train = fallback_offers().remove(0);
    train.fares = vec![fare];
    train
}

fn issue(fare: FareClass, passengers: Vec<PassengerEntry>) -> Result<Ticket, DraftError> {
    let train = train_with(fare.clone());
    let mut draft = BookingDraft::new(Selection::new(train, fare)?);
    for (index, entry) in passengers.into_iter().enumerate() {
        if index > 0 {
            draft.add_passenger()?;
        }
        draft.update_passenger(index, entry)?;
    }
    draft.set_contact("9876543210", "asha@example.com");
    let passengers = draft.submit()?;
    let (train, fare) = draft.selection().clone().into_parts();

    Ok(Ticket::issue(
        Pnr::from_number(5_000_000_000).unwrap(),
        train,
        fare,
        passengers,
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ))
}

// ────────────────────────────────────────────────────────────────────
// Properties
// ────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn selectable_unless_waitlisted_and_empty(fare in arb_fare()) {
        let closed = fare.status == SeatStatus::Waitlist && fare.available == 0;
        prop_assert_eq!(fare.is_selectable(), !closed);
        prop_assert_eq!(Selection::new(train_with(fare.clone()), fare).is_ok(), !closed);
    }

    #[test]
    fn total_is_price_times_passengers(
        price in 0u64..100_000,
        passengers in prop::collection::vec(arb_passenger(), 1..=MAX_PASSENGERS),
    ) {
        let fare = FareClass {
            class_type: ClassType::Ac3,
            available: 10,
            price: Money::from_rupees(price),
            status: SeatStatus::Available,
        };
        let count = passengers.len() as u64;

        let ticket = issue(fare, passengers).unwrap();

        prop_assert_eq!(ticket.total_amount, Money::from_rupees(price * count));
        prop_assert_eq!(ticket.status, BookingStatus::Confirmed);
    }

    #[test]
    fn money_times_saturates(rupees in any::<u64>(), count in 0usize..1_000) {
        let expected = rupees.checked_mul(count as u64).unwrap_or(u64::MAX);
        prop_assert_eq!(Money::from_rupees(rupees).times(count).rupees(), expected);
    }

    #[test]
    fn ages_outside_range_are_rejected(age in prop_oneof![Just(0u8), 121u8..=u8::MAX]) {
        let fare = fallback_offers().remove(0).fares.remove(2);
        let passenger = PassengerEntry::new("Asha Rao", age, Gender::Female);

        let result = issue(fare, vec![passenger]);

        let is_invalid_passenger = matches!(result, Err(DraftError::InvalidPassenger { index: 0, .. }));
        prop_assert!(is_invalid_passenger);
    }

    #[test]
    fn cancel_succeeds_exactly_once(extra_attempts in 1usize..5) {
        let fare = fallback_offers().remove(0).fares.remove(2);
        let mut ticket = issue(fare, vec![PassengerEntry::new("Asha Rao", 31, Gender::Female)]).unwrap();

        prop_assert!(ticket.cancel().is_ok());
        for _ in 0..extra_attempts {
            prop_assert_eq!(ticket.cancel(), Err(TicketError::AlreadyCancelled(ticket.pnr.clone())));
        }
        prop_assert_eq!(ticket.status, BookingStatus::Cancelled);
    }

    #[test]
    fn offer_parsing_never_panics(raw in ".{0,400}") {
        let _ = parse_offers(&raw);
    }

    #[test]
    fn parsed_offers_always_have_fares(raw in r#"\[\{"trainNumber":"[0-9]{5}","trainName":"[A-Za-z ]{1,12}","source":"A","destination":"B","departureTime":"06:00","arrivalTime":"12:00","duration":"6h","availability":\[(\{"type":"(SL|3A|2A|1A|XX)","available":[0-9]{1,3},"price":[0-9]{1,5},"status":"(AVAILABLE|RAC|WAITLIST|SOLD)"\},?){0,3}\]\}\]"#) {
        if let Ok(offers) = parse_offers(&raw) {
            prop_assert!(offers.iter().all(|offer| !offer.fares.is_empty()));
        }
    }
}
