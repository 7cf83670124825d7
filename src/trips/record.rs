/// Pickup timestamp column of the green-taxi schema.
pub const PICKUP: &str = "lpep_pickup_datetime";
/// Dropoff timestamp column of the green-taxi schema.
pub const DROPOFF: &str = "lpep_dropoff_datetime";

/// Model inputs, in the column order of the feature matrix.
pub const FEATURES: [&str; 6] = [
    "PULocationID",
    "DOLocationID",
    "trip_distance",
    "passenger_count",
    "fare_amount",
    "total_amount",
];

/// Label derived from the timestamps.
pub const TARGET: &str = "duration";

/// Index of `passenger_count` inside `FEATURES`.
pub const PASSENGER_COUNT: usize = 3;

const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// A raw trip as read from the dataset.
///
/// Timestamps are microseconds since the Unix epoch. Any value may be null.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripRecord {
    pub pickup_us: Option<i64>,
    pub dropoff_us: Option<i64>,
    pub pu_location_id: Option<f64>,
    pub do_location_id: Option<f64>,
    pub trip_distance: Option<f64>,
    pub passenger_count: Option<f64>,
    pub fare_amount: Option<f64>,
    pub total_amount: Option<f64>,
}

impl TripRecord {
    /// Trip duration in minutes, if both timestamps are present and their
    /// difference fits in an `i64`.
    pub fn duration_minutes(&self) -> Option<f64> {
        let (pickup, dropoff) = (self.pickup_us?, self.dropoff_us?);
        Some(dropoff.checked_sub(pickup)? as f64 / MICROS_PER_MINUTE)
    }

    /// Feature values in `FEATURES` order.
    pub fn features(&self) -> [Option<f64>; 6] {
        [
            self.pu_location_id,
            self.do_location_id,
            self.trip_distance,
            self.passenger_count,
            self.fare_amount,
            self.total_amount,
        ]
    }
}

/// A trip projected onto the fixed feature columns plus its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedTrip {
    pub features: [f64; 6],
    pub duration: f64,
}

impl ProcessedTrip {
    pub fn passenger_count(&self) -> f64 {
        self.features[PASSENGER_COUNT]
    }

    /// Rebuilds a raw record with the same features and duration.
    ///
    /// The pickup is placed at the epoch; the dropoff is rounded to the
    /// nearest microsecond.
    pub fn to_record(&self) -> TripRecord {
        let [pu, dol, distance, passengers, fare, total] = self.features;
        TripRecord {
            pickup_us: Some(0),
            dropoff_us: Some((self.duration * MICROS_PER_MINUTE).round() as i64),
            pu_location_id: Some(pu),
            do_location_id: Some(dol),
            trip_distance: Some(distance),
            passenger_count: Some(passengers),
            fare_amount: Some(fare),
            total_amount: Some(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(pickup: i64, dropoff: i64) -> TripRecord {
        TripRecord {
            pickup_us: Some(pickup),
            dropoff_us: Some(dropoff),
            ..TripRecord::default()
        }
    }

    #[test]
    fn duration_is_in_minutes() {
        assert_eq!(timed(0, 15 * 60_000_000).duration_minutes(), Some(15.0));
        assert_eq!(timed(60_000_000, 0).duration_minutes(), Some(-1.0));
        assert_eq!(TripRecord::default().duration_minutes(), None);
    }

    #[test]
    fn extreme_timestamps_have_no_duration() {
        assert_eq!(timed(i64::MIN, i64::MAX).duration_minutes(), None);
        assert_eq!(timed(i64::MAX, i64::MIN).duration_minutes(), None);
    }
}
