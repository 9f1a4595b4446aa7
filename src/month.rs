//! Month arithmetic and the fixed 6x7 month grid.
//!
//! All computations here are total over `i32` years and work on a proleptic
//! Gregorian calendar with Sunday as the first weekday. Paging saturates at
//! the first and last month of that range.

use chrono::{Datelike, Local, Month, NaiveDate};
use num_traits::FromPrimitive;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{Error, ErrorKind, Result};

pub const COLUMNS: usize = 7;
pub const ROWS: usize = 6;
pub const CELLS: usize = COLUMNS * ROWS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarMonth {
    month: Month,
    year: i32,
}

impl CalendarMonth {
    /// Fails with `OutOfRange` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let month = Month::from_u32(month).ok_or_else(|| {
            Error::new(
                ErrorKind::OutOfRange,
                &format!("month {} is not in 1..=12", month),
            )
        })?;

        Ok(CalendarMonth { month, year })
    }

    pub fn from_parts(year: i32, month: Month) -> Self {
        CalendarMonth { month, year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn number(&self) -> u32 {
        self.month.number_from_month()
    }

    pub fn name(&self) -> &'static str {
        self.month.name()
    }

    /// The following month. December of `i32::MAX` has none and stays put.
    pub fn next(&self) -> Self {
        let next_month = self.month.succ();
        let year = if next_month == Month::January {
            self.year.checked_add(1)
        } else {
            Some(self.year)
        };

        match year {
            Some(year) => CalendarMonth {
                month: next_month,
                year,
            },
            None => *self,
        }
    }

    /// The preceding month. January of `i32::MIN` has none and stays put.
    pub fn prev(&self) -> Self {
        let prev_month = self.month.pred();
        let year = if prev_month == Month::December {
            self.year.checked_sub(1)
        } else {
            Some(self.year)
        };

        match year {
            Some(year) => CalendarMonth {
                month: prev_month,
                year,
            },
            None => *self,
        }
    }

    /// Pages `delta` months forward (or backward for negative values),
    /// saturating at January of `i32::MIN` and December of `i32::MAX`.
    pub fn shift(&self, delta: i64) -> Self {
        let first = i32::MIN as i64 * 12;
        let last = i32::MAX as i64 * 12 + 11;
        let total = (self.year as i64 * 12 + self.month.number_from_month() as i64 - 1)
            .saturating_add(delta)
            .clamp(first, last);
        let month = (total.rem_euclid(12) + 1) as u32;

        CalendarMonth {
            // rem_euclid keeps the value in 1..=12
            month: Month::from_u32(month).unwrap_or(Month::January),
            // in i32 range after the clamp
            year: total.div_euclid(12) as i32,
        }
    }

    pub fn days(&self) -> u32 {
        days_in_month(self)
    }

    pub fn start_weekday(&self) -> u32 {
        start_weekday(self)
    }

    /// The chrono date of `day`, if chrono can represent the year.
    pub fn date(&self, day: u32) -> Result<NaiveDate> {
        if day < 1 || day > self.days() {
            return Err(out_of_range_day(self, day));
        }

        NaiveDate::from_ymd_opt(self.year, self.number(), day).ok_or_else(|| {
            Error::new(
                ErrorKind::OutOfRange,
                &format!("year {} is not representable as a date", self.year),
            )
        })
    }

    pub fn grid(&self) -> MonthGrid {
        build_grid(self)
    }

    pub fn current() -> Self {
        CalendarMonth::from(Local::now().date_naive())
    }
}

impl Default for CalendarMonth {
    fn default() -> Self {
        CalendarMonth::current()
    }
}

impl<T: Datelike> From<T> for CalendarMonth {
    fn from(date: T) -> Self {
        CalendarMonth {
            month: Month::from_u32(date.month()).unwrap_or(Month::January),
            year: date.year(),
        }
    }
}

impl Add<u32> for CalendarMonth {
    type Output = CalendarMonth;
    fn add(self, rhs: u32) -> Self::Output {
        self.shift(rhs as i64)
    }
}

impl Sub<u32> for CalendarMonth {
    type Output = CalendarMonth;
    fn sub(self, rhs: u32) -> Self::Output {
        self.shift(-(rhs as i64))
    }
}

impl Ord for CalendarMonth {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.number().cmp(&other.number()))
    }
}

impl PartialOrd for CalendarMonth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.number())
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(month: &CalendarMonth) -> u32 {
    match month.month {
        Month::February => {
            if is_leap_year(month.year) {
                29
            } else {
                28
            }
        }
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

/// Weekday of the first day of `month`, 0 = Sunday .. 6 = Saturday.
pub fn start_weekday(month: &CalendarMonth) -> u32 {
    const OFFSETS: [i64; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

    let m = month.number() as usize;
    // January and February count towards the previous year
    let y = month.year as i64 - if m < 3 { 1 } else { 0 };

    (y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400) + OFFSETS[m - 1] + 1)
        .rem_euclid(7) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    month: CalendarMonth,
    start_weekday: u32,
    cells: [Option<u32>; CELLS],
}

pub fn build_grid(month: &CalendarMonth) -> MonthGrid {
    let start = start_weekday(month) as i64;
    let days = days_in_month(month) as i64;

    let mut cells = [None; CELLS];
    for (i, cell) in cells.iter_mut().enumerate() {
        let day = i as i64 - start + 1;
        if (1..=days).contains(&day) {
            *cell = Some(day as u32);
        }
    }

    MonthGrid {
        month: *month,
        start_weekday: start as u32,
        cells,
    }
}

pub fn day_cell_index(month: &CalendarMonth, day: u32) -> Result<usize> {
    if day < 1 || day > days_in_month(month) {
        return Err(out_of_range_day(month, day));
    }

    Ok((start_weekday(month) + day - 1) as usize)
}

fn out_of_range_day(month: &CalendarMonth, day: u32) -> Error {
    Error::new(
        ErrorKind::OutOfRange,
        &format!(
            "day {} is not in 1..={} for {}",
            day,
            days_in_month(month),
            month
        ),
    )
}

impl MonthGrid {
    pub fn month(&self) -> &CalendarMonth {
        &self.month
    }

    pub fn start_weekday(&self) -> u32 {
        self.start_weekday
    }

    pub fn cells(&self) -> &[Option<u32>; CELLS] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied().flatten()
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[Option<u32>]> {
        self.cells.chunks(COLUMNS)
    }

    /// Number of weeks holding at least one day of the month.
    pub fn used_weeks(&self) -> usize {
        self.weeks()
            .filter(|week| week.iter().any(Option::is_some))
            .count()
    }

    pub fn day_cell_index(&self, day: u32) -> Result<usize> {
        day_cell_index(&self.month, day)
    }

    pub fn next(&self) -> MonthGrid {
        build_grid(&self.month.next())
    }

    pub fn prev(&self) -> MonthGrid {
        build_grid(&self.month.prev())
    }
}
