pub mod api;
pub mod rank;

pub use api::{router, SearchState};
pub use rank::{paginate, rank, RankedDocument};
