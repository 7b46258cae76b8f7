//! System clock adapter.

use chrono::{DateTime, Utc};

use crate::infrastructure::ports::ClockPort;

pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
