//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_recent_utc() {
        let before = Utc::now();
        let stamp = now();
        let after = Utc::now();

        assert!(before <= stamp && stamp <= after);
        assert!(stamp.to_rfc3339().ends_with("+00:00"));
    }
}
