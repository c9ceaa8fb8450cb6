//! Plain data records shared by the queue and the tasks.

pub mod catalog;
pub mod order;

pub use catalog::*;
pub use order::*;
