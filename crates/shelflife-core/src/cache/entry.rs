use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A value paired with the absolute time after which it is no longer valid.
///
/// Persisted as `{"value": ..., "expires": <epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Entry<T> {
    pub value: T,
    #[serde(rename = "expires")]
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub expires_at_millis: i64,
}

impl<T> Entry<T> {
    pub fn new(value: T, expires_at_millis: i64) -> Self {
        Self {
            value,
            expires_at_millis,
        }
    }

    /// Entry expiring `ttl_minutes` after `now_millis`, rounded to the
    /// nearest millisecond. Zero or negative TTLs give an entry that is
    /// already (or immediately) expired. Infinite TTLs saturate, NaN counts
    /// as zero.
    pub fn expiring_in(value: T, ttl_minutes: f64, now_millis: i64) -> Self {
        // `as` saturates at the i64 bounds
        let ttl_millis = (ttl_minutes * MILLIS_PER_MINUTE as f64).round() as i64;
        Self::new(value, now_millis.saturating_add(ttl_millis))
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis > self.expires_at_millis
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at_millis)
    }

    /// Human-readable time left, e.g. "expires in 5m" or "expired"
    pub fn expiry_display(&self, now_millis: i64) -> String {
        if self.is_expired_at(now_millis) {
            return "expired".to_string();
        }

        let minutes = (self.expires_at_millis - now_millis) / MILLIS_PER_MINUTE;
        if minutes < 1 {
            "expires in <1m".to_string()
        } else if minutes < 60 {
            format!("expires in {}m", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("expires in {}h", hours + 1)
            } else {
                format!("expires in {}h", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("expires in {}d", days + 1)
            } else {
                format!("expires in {}d", days)
            }
        }
    }
}

impl Entry<Value> {
    /// Read a persisted record without committing to a payload type.
    ///
    /// `Ok(None)` when the text is JSON but not a record: not an object, or
    /// `expires` missing or not a number. A fractional `expires` is floored,
    /// and a missing `value` reads as `null`.
    pub fn parse(raw: &str) -> Result<Option<Self>, serde_json::Error> {
        let Value::Object(mut fields) = serde_json::from_str(raw)? else {
            return Ok(None);
        };
        let Some(expires) = fields.get("expires").and_then(expiry_millis) else {
            return Ok(None);
        };
        let value = fields.remove("value").unwrap_or(Value::Null);
        Ok(Some(Self::new(value, expires)))
    }
}

/// Integer millis, or a fractional one floored (same comparison result)
fn expiry_millis(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|millis| millis.is_finite())
            .map(|millis| millis.floor() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_expiring_in_minutes() {
        let entry = Entry::expiring_in("hello", 1.0, NOW);
        assert_eq!(entry.expires_at_millis, NOW + 60_000);
        assert!(!entry.is_expired_at(NOW + 60_000));
        assert!(entry.is_expired_at(NOW + 60_001));
    }

    #[test]
    fn test_negative_ttl_is_already_expired() {
        let entry = Entry::expiring_in(1, -5.0, NOW);
        assert_eq!(entry.expires_at_millis, NOW - 300_000);
        assert!(entry.is_expired_at(NOW));
    }

    #[test]
    fn test_zero_ttl_expires_after_now() {
        let entry = Entry::expiring_in(1, 0.0, NOW);
        assert!(!entry.is_expired_at(NOW));
        assert!(entry.is_expired_at(NOW + 1));
    }

    #[test]
    fn test_fractional_ttl_keeps_seconds() {
        let half = Entry::expiring_in((), 0.5, NOW);
        assert_eq!(half.expires_at_millis, NOW + 30_000);

        let tiny = Entry::expiring_in((), 0.0001, NOW);
        assert_eq!(tiny.expires_at_millis, NOW + 6);
        assert!(tiny.is_expired_at(NOW + 7));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        assert_eq!(Entry::expiring_in((), f64::MAX, NOW).expires_at_millis, i64::MAX);
        assert_eq!(Entry::expiring_in((), f64::INFINITY, NOW).expires_at_millis, i64::MAX);
        assert_eq!(Entry::expiring_in((), f64::NEG_INFINITY, NOW).expires_at_millis, i64::MIN);
        assert_eq!(Entry::expiring_in((), f64::NAN, NOW).expires_at_millis, NOW);
    }

    #[test]
    fn test_parse_untyped_record() {
        let entry = Entry::<Value>::parse(r#"{"value":{"a":1},"expires":1700000000000.5}"#)
            .unwrap()
            .unwrap();
        assert_eq!(entry.value, serde_json::json!({"a": 1}));
        assert_eq!(entry.expires_at_millis, NOW);

        let bare = Entry::<Value>::parse(r#"{"expires":0}"#).unwrap().unwrap();
        assert_eq!(bare, Entry::new(Value::Null, 0));

        for raw in [r#"{"value":1}"#, "null", "[1]", r#"{"value":1,"expires":"soon"}"#] {
            assert_eq!(Entry::<Value>::parse(raw).unwrap(), None);
        }
        assert!(Entry::<Value>::parse("not json").is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = Entry::new(vec![1, 2], 42);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":[1,2],"expires":42}"#);

        let back: Entry<Vec<i32>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_expires_at_as_datetime() {
        let entry = Entry::new((), NOW);
        assert_eq!(entry.expires_at().unwrap().timestamp_millis(), NOW);
    }

    #[test]
    fn test_expiry_display() {
        let minute = 60_000;
        assert_eq!(Entry::new((), NOW - 1).expiry_display(NOW), "expired");
        assert_eq!(Entry::new((), NOW + 30_000).expiry_display(NOW), "expires in <1m");
        assert_eq!(Entry::new((), NOW + 5 * minute).expiry_display(NOW), "expires in 5m");
        assert_eq!(Entry::new((), NOW + 80 * minute).expiry_display(NOW), "expires in 1h");
        assert_eq!(Entry::new((), NOW + 90 * minute).expiry_display(NOW), "expires in 2h");
        assert_eq!(Entry::new((), NOW + 3 * 1440 * minute).expiry_display(NOW), "expires in 3d");
        assert_eq!(
            Entry::new((), NOW + (1440 + 13 * 60) * minute).expiry_display(NOW),
            "expires in 2d"
        );
    }
}
