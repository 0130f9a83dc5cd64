pub mod locate;
pub mod merge;
pub mod repair;
pub mod resolve;
