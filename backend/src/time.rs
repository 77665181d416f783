use chrono::{DateTime, Utc};

/// Wall-clock "now". Operations take it as a parameter so tests can pin it.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
