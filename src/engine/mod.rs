pub mod ledger;
pub mod lifecycle;
pub mod matching;
pub mod settlement;
