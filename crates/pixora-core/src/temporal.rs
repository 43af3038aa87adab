//! # Request Dates
//!
//! Request dates are stored as full-precision UTC instants and rendered for
//! clients as `YYYY-MM-DD HH:MM:SS` (UTC, no offset, no sub-seconds).

use chrono::{DateTime, Utc};

/// `strftime` pattern used for every `request_date` in API responses.
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a request date the way API responses expose it.
pub fn format_request_date(dt: &DateTime<Utc>) -> String {
    dt.format(REQUEST_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn formats_without_offset_or_fraction() {
        let dt = Utc.with_ymd_and_hms(2025, 5, 18, 7, 57, 10).unwrap()
            + chrono::Duration::milliseconds(978);
        assert_eq!(format_request_date(&dt), "2025-05-18 07:57:10");
    }

    proptest! {
        #[test]
        fn formatted_dates_sort_like_instants(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
            let da = DateTime::from_timestamp(a, 0).unwrap();
            let db = DateTime::from_timestamp(b, 0).unwrap();
            prop_assert_eq!(
                da.cmp(&db),
                format_request_date(&da).cmp(&format_request_date(&db))
            );
        }
    }
}
