mod dashboard;
mod matching;

pub use dashboard::DashboardService;
pub use matching::MatchingService;
