mod score_entries;

pub use score_entries::ScoreEntryRepository;
