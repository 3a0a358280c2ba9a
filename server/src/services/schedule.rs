use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};

/// Weekly reset calendar: every Sunday at 00:00 in a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSchedule {
    offset: FixedOffset,
}

impl ResetSchedule {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Latest Sunday midnight at or before `now`.
    pub fn most_recent_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let days_back = i64::from(local.weekday().num_days_from_sunday());
        let midnight = (local.date_naive() - Duration::days(days_back)).and_time(NaiveTime::MIN);
        let utc_offset = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(midnight - utc_offset))
    }

    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.most_recent_boundary(now) + Duration::days(7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_midweek_goes_back_to_sunday() {
        // 2026-10-16 is a Friday.
        let schedule = ResetSchedule::utc();
        assert_eq!(
            schedule.most_recent_boundary(at("2026-10-16T15:30:00Z")),
            at("2026-10-11T00:00:00Z")
        );
        assert_eq!(
            schedule.next_boundary(at("2026-10-16T15:30:00Z")),
            at("2026-10-18T00:00:00Z")
        );
    }

    #[test]
    fn test_sunday_midnight_is_its_own_boundary() {
        let schedule = ResetSchedule::utc();
        let sunday = at("2026-10-18T00:00:00Z");
        assert_eq!(schedule.most_recent_boundary(sunday), sunday);
        assert_eq!(
            schedule.most_recent_boundary(sunday - Duration::seconds(1)),
            at("2026-10-11T00:00:00Z")
        );
    }

    #[test]
    fn test_offset_shifts_boundary() {
        // UTC+2: Sunday 00:00 local is Saturday 22:00 UTC.
        let schedule = ResetSchedule::new(FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            schedule.most_recent_boundary(at("2026-10-17T23:00:00Z")),
            at("2026-10-17T22:00:00Z")
        );
        assert_eq!(
            schedule.most_recent_boundary(at("2026-10-17T21:00:00Z")),
            at("2026-10-10T22:00:00Z")
        );
    }
}
