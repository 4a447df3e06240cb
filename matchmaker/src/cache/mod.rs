mod clock;
mod metric_cache;
mod score_cache;
mod single_flight;

pub use clock::{Clock, ManualClock, SystemClock};
pub use metric_cache::MetricCache;
pub use score_cache::{score_key, ScoreCache, SCORE_KEY_PREFIX};
pub use single_flight::SingleFlight;
