//! Static offers served when no generated results are available.

use crate::types::{ClassType, FareClass, Money, SeatStatus, TrainOffer};

fn fare(class_type: ClassType, available: u32, price: u64, status: SeatStatus) -> FareClass {
    FareClass {
        class_type,
        available,
        price: Money::from_rupees(price),
        status,
    }
}

fn train(
    number: &str,
    name: &str,
    route: (&str, &str),
    times: (&str, &str, &str),
    fares: Vec<FareClass>,
) -> TrainOffer {
    TrainOffer {
        number: number.to_string(),
        name: name.to_string(),
        origin: route.0.to_string(),
        destination: route.1.to_string(),
        departure_time: times.0.to_string(),
        arrival_time: times.1.to_string(),
        duration: times.2.to_string(),
        fares,
    }
}

/// The fixed fallback set: Rajdhani, Golden Temple Mail and Vande Bharat
///
/// Stations are fixed and do not follow the query.
#[must_use]
pub fn fallback_offers() -> Vec<TrainOffer> {
    use ClassType::{Ac1, Ac2, Ac3, Sleeper};
    use SeatStatus::{Available, Rac, Waitlist};

    vec![
        train(
            "12951",
            "Rajdhani Express",
            ("Mumbai", "Delhi"),
            ("17:00", "08:30", "15h 30m"),
            vec![
                fare(Ac1, 12, 4500, Available),
                fare(Ac2, 45, 2800, Available),
                fare(Ac3, 120, 1900, Available),
            ],
        ),
        train(
            "12903",
            "Golden Temple Mail",
            ("Mumbai", "Amritsar"),
            ("18:45", "07:20", "12h 35m"),
            vec![
                fare(Ac2, 8, 2400, Rac),
                fare(Ac3, 0, 1600, Waitlist),
                fare(Sleeper, 200, 650, Available),
            ],
        ),
        train(
            "22221",
            "Vande Bharat Exp",
            ("Mumbai", "Gandhinagar"),
            ("06:10", "12:25", "6h 15m"),
            vec![
                fare(Ac1, 50, 1500, Available),
                fare(Ac2, 145, 900, Available),
            ],
        ),
    ]
}
