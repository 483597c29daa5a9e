pub mod advance;
pub mod courier;
pub mod order;
pub mod settlement;
