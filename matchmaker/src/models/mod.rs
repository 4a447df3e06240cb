mod common;
mod metric;
mod profile;
mod score;

pub use common::*;
pub use metric::*;
pub use profile::*;
pub use score::*;
