pub mod ledger;
pub mod mirror;
pub mod schedule;
pub mod store;
