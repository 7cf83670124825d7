use super::record::{ProcessedTrip, TripRecord};

/// Shortest kept trip, in minutes (inclusive).
pub const MIN_DURATION: f64 = 1.0;
/// Longest kept trip, in minutes (inclusive).
pub const MAX_DURATION: f64 = 60.0;
/// Passenger counts must be strictly above this value.
pub const MIN_PASSENGERS: f64 = 0.0;
/// Passenger counts must be strictly below this value.
pub const MAX_PASSENGERS: f64 = 8.0;

/// Why rows were discarded.
///
/// A row is attributed to the first rule it fails, in the order
/// duration, passenger count, missing feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropStats {
    pub seen: usize,
    pub kept: usize,
    pub duration: usize,
    pub passenger_count: usize,
    pub missing_feature: usize,
}

impl DropStats {
    #[inline]
    pub fn dropped(&self) -> usize {
        self.duration + self.passenger_count + self.missing_feature
    }
}

/// Output of [`preprocess`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preprocessed {
    pub trips: Vec<ProcessedTrip>,
    pub stats: DropStats,
}

/// Returns true when a trip of `minutes` is kept.
#[inline]
pub fn valid_duration(minutes: f64) -> bool {
    (MIN_DURATION..=MAX_DURATION).contains(&minutes)
}

/// Returns true when `count` passengers are kept.
#[inline]
pub fn valid_passenger_count(count: f64) -> bool {
    count > MIN_PASSENGERS && count < MAX_PASSENGERS
}

/// Derives the duration label, drops out-of-range trips and projects the rest
/// onto the feature columns.
///
/// Null timestamps count as an invalid duration and a null passenger count as
/// an invalid passenger count. Rows whose remaining features contain a null
/// are dropped as `missing_feature`. Input order is preserved.
pub fn preprocess(records: &[TripRecord]) -> Preprocessed {
    let mut stats = DropStats {
        seen: records.len(),
        ..DropStats::default()
    };
    let mut trips = Vec::with_capacity(records.len());

    for record in records {
        let Some(duration) = record.duration_minutes().filter(|d| valid_duration(*d)) else {
            stats.duration += 1;
            continue;
        };

        if !record.passenger_count.is_some_and(valid_passenger_count) {
            stats.passenger_count += 1;
            continue;
        }

        let values = record.features();
        if !values.iter().all(|v| matches!(v, Some(x) if x.is_finite())) {
            stats.missing_feature += 1;
            continue;
        }

        trips.push(ProcessedTrip {
            features: values.map(|v| v.unwrap_or_default()),
            duration,
        });
    }

    stats.kept = trips.len();
    Preprocessed { trips, stats }
}
