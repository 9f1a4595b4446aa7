use itertools::Itertools;
use std::fmt;

use crate::month::{MonthGrid, COLUMNS};

const WEEKDAY_LABELS: [&str; COLUMNS] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const CELL_WIDTH: usize = 3;

struct DayCell {
    day_num: Option<u32>,
    symbol: Option<char>,
}

impl fmt::Display for DayCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.day_num {
            Some(day) => write!(f, "{:>2}{}", day, self.symbol.unwrap_or(' ')),
            None => write!(f, "{:width$}", "", width = CELL_WIDTH),
        }
    }
}

/// Plain text rendering of a month grid in the style of `cal(1)`.
pub struct MonthView<'g> {
    grid: &'g MonthGrid,
    today: Option<u32>,
    marked: Vec<u32>,
    today_symbol: Option<char>,
    mark_symbol: Option<char>,
}

impl<'g> MonthView<'g> {
    pub fn new(grid: &'g MonthGrid) -> Self {
        MonthView {
            grid,
            today: None,
            marked: Vec::new(),
            today_symbol: Some('*'),
            mark_symbol: Some('+'),
        }
    }

    pub fn today(mut self, day: u32) -> Self {
        self.today = Some(day);
        self
    }

    pub fn marked(mut self, days: Vec<u32>) -> Self {
        self.marked = days;
        self
    }

    pub fn today_symbol(mut self, symbol: char) -> Self {
        self.today_symbol = Some(symbol);
        self
    }

    pub fn no_today_symbol(mut self) -> Self {
        self.today_symbol = None;
        self
    }

    pub fn mark_symbol(mut self, symbol: char) -> Self {
        self.mark_symbol = Some(symbol);
        self
    }

    pub fn no_mark_symbol(mut self) -> Self {
        self.mark_symbol = None;
        self
    }

    fn cell(&self, day_num: Option<u32>) -> DayCell {
        let symbol = day_num.and_then(|day| {
            if self.today == Some(day) {
                self.today_symbol
            } else if self.marked.contains(&day) {
                self.mark_symbol
            } else {
                None
            }
        });

        DayCell { day_num, symbol }
    }

    pub fn width() -> usize {
        COLUMNS * CELL_WIDTH - 1
    }
}

impl fmt::Display for MonthView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = self.grid.month();
        let title = format!("{} {}", month.name(), month.year());

        writeln!(
            f,
            "{}",
            format!("{:^width$}", title, width = Self::width()).trim_end()
        )?;
        writeln!(f, "{}", WEEKDAY_LABELS.iter().join(" "))?;

        let rows = self
            .grid
            .weeks()
            .map(|week| {
                week.iter()
                    .map(|day_num| self.cell(*day_num))
                    .join("")
                    .trim_end()
                    .to_owned()
            })
            .join("\n");

        write!(f, "{}", rows)
    }
}
