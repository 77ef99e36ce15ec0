use chrono::{DateTime, Days, NaiveTime, TimeZone};

/// The first instant strictly after `now` whose wall-clock time in `now`'s
/// zone is `at`. Days on which `at` does not exist (DST gap) are skipped.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        day = day + Days::new(1);
    }
}
