use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};

// Windowing types and month arithmetic shared by the aggregation passes.

/// Half-open calendar-month interval: a timestamp `t` is in window iff
/// `start <= t < end`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MonthWindow {
  pub year: i32,
  pub month: u32,
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

impl MonthWindow {
  pub fn contains(&self, t: NaiveDateTime) -> bool {
    self.start <= t && t < self.end
  }

  pub fn label(&self) -> String {
    format!("{:04}-{:02}", self.year, self.month)
  }
}

fn first_instant(year: i32, month: u32) -> NaiveDateTime {
  // month is validated by the caller
  NaiveDate::from_ymd_opt(year, month, 1)
    .expect("first of month")
    .and_hms_opt(0, 0, 0)
    .expect("midnight")
}

/// Compute the window spanning one calendar month. The end bound is the first
/// instant of the following month, wrapping the year after December.
pub fn month_window(month: u32, year: i32) -> Result<MonthWindow> {
  if !(1..=12).contains(&month) {
    bail!("month must be an integer between 1 and 12, got {month}");
  }
  let (next_m, next_y) = if month == 12 { (1, year + 1) } else { (month + 1, year) };

  Ok(MonthWindow {
    year,
    month,
    start: first_instant(year, month),
    end: first_instant(next_y, next_m),
  })
}

/// Month decrement with year wrap at the January/December boundary.
pub fn previous_month(month: u32, year: i32) -> (u32, i32) {
  if month == 1 {
    (12, year - 1)
  } else {
    (month - 1, year)
  }
}

/// The `n` months ending at `(month, year)`: anchor first, walking backward.
pub fn trailing_months(month: u32, year: i32, n: u32) -> Vec<(u32, i32)> {
  let mut out = Vec::with_capacity(n as usize);
  let (mut m, mut y) = (month, year);

  for _ in 0..n {
    out.push((m, y));
    (m, y) = previous_month(m, y);
  }

  out
}
