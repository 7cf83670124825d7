//! Green-taxi trip records and the preprocessing that turns them into
//! training rows.

mod loader;
mod preprocess;
mod record;

pub use loader::{load_trips, trips_from_frame};
pub use preprocess::{
    DropStats, MAX_DURATION, MAX_PASSENGERS, MIN_DURATION, MIN_PASSENGERS, Preprocessed,
    preprocess, valid_duration, valid_passenger_count,
};
pub use record::{DROPOFF, FEATURES, PICKUP, ProcessedTrip, TARGET, TripRecord};
