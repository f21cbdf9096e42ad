pub mod contest_store;

pub use contest_store::{ContestStore, ContestSummary};
