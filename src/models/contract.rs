use serde::{Deserialize, Serialize};

/// A one-hour delivery window, identified by its endpoints in Unix-ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Contract {
    pub delivery_start: i64,
    pub delivery_end: i64,
}

impl Contract {
    pub const HOUR_MS: i64 = 3_600_000;

    pub fn new(delivery_start: i64, delivery_end: i64) -> Self {
        Self {
            delivery_start,
            delivery_end,
        }
    }

    /// Both endpoints hour-aligned, exactly one hour apart.
    pub fn is_valid(&self) -> bool {
        self.delivery_start % Self::HOUR_MS == 0
            && self.delivery_end % Self::HOUR_MS == 0
            && self.delivery_end - self.delivery_start == Self::HOUR_MS
    }
}
