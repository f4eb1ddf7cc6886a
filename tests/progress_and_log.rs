use rekap::{
    days_between, estimate_posts_remaining, estimate_time_remaining, format_duration, parse_ymd, FileLog, LogSink,
    ProgressReporter, YearMonth,
};
use std::fs;
use std::time::Duration;

#[test]
fn durations_render_as_hours_minutes_seconds() {
    assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    assert_eq!(format_duration(Duration::from_secs(59)), "0h 0m 59s");
    assert_eq!(format_duration(Duration::from_secs(26 * 3600)), "26h 0m 0s");
}

/// Remaining posts = min(budget left, days back to the start * posts/day).
#[test]
fn posts_remaining_is_min_of_budget_and_days() {
    let start = parse_ymd("2025-07-01").unwrap();
    let current = parse_ymd("2025-07-11").unwrap();

    assert_eq!(days_between(current, start), 10);
    assert_eq!(estimate_posts_remaining(1000, 20, current, start, 3), 30);
    assert_eq!(estimate_posts_remaining(25, 20, current, start, 3), 5);
    assert_eq!(estimate_posts_remaining(25, 25, current, start, 3), 0);
    assert_eq!(estimate_posts_remaining(1000, 20, start, start, 3), 0);
    assert_eq!(estimate_posts_remaining(1000, 20, current, start, 7), 70);
}

#[test]
fn eta_is_average_time_times_remaining() {
    let eta = estimate_time_remaining(Duration::from_secs(100), 10, 30).unwrap();
    assert_eq!(eta, Duration::from_secs(300));
    assert_eq!(estimate_time_remaining(Duration::from_secs(100), 10, 0), None);
    assert_eq!(estimate_time_remaining(Duration::from_secs(100), 0, 5), None);
}

/// The reporter only counts and displays; a hidden bar keeps it quiet in tests.
#[test]
fn reporter_tracks_counts_and_eta() {
    let start = parse_ymd("2025-07-01").unwrap();
    let mut r = ProgressReporter::new(100, start, 3, false);
    assert_eq!(r.last_eta(), None);

    r.set_examined(4);
    r.post_done(parse_ymd("2025-07-20").unwrap());
    r.set_examined(5);
    r.post_done(parse_ymd("2025-07-19").unwrap());

    assert_eq!(r.examined(), 5);
    assert_eq!(r.posts_with_rows(), 2);
    assert!(r.last_eta().is_some());
    r.finish();
}

#[test]
fn year_month_buckets() {
    let d = parse_ymd("2025-07-31").unwrap();
    assert_eq!(YearMonth::of(d).to_string(), "2025-07");
    assert_eq!(YearMonth::of(parse_ymd("2025-07-01").unwrap()), YearMonth::of(d));
    assert!(YearMonth::of(d) < YearMonth::of(parse_ymd("2025-08-01").unwrap()));
    assert_eq!(YearMonth::of(parse_ymd("0987-01-05").unwrap()).to_string(), "0987-01");
    assert!(parse_ymd("2025/07/31").is_err());
}

/// File log appends timestamped lines and keeps earlier content.
#[test]
fn file_log_appends_timestamped_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("scraper.log");
    fs::write(&path, "earlier\n").unwrap();

    let log = FileLog::open(&path).unwrap();
    log.emit("Starting scrape");
    log.emit("two\nlines");
    drop(log);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "earlier");
    assert!(lines[1].starts_with('[') && lines[1].ends_with("] Starting scrape"));
    assert!(lines[3].ends_with("] lines"));
}
