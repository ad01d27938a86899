pub mod clock;
pub mod parse;
pub mod test_utils;

pub use clock::{Clock, FixedClock, SystemClock};
