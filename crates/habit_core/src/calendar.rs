use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::date::{format_date, monday_on_or_before, WeekDay};
use crate::habit::Habit;

pub const YEAR_SPAN_DAYS: i64 = 364;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekViewDay {
    pub day: WeekDay,
    pub done: bool,
}

pub fn build_week_view(habit: &Habit, week: &[WeekDay]) -> Vec<WeekViewDay> {
    week.iter()
        .map(|day| WeekViewDay {
            day: day.clone(),
            done: habit.is_done(day.date),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearCell {
    pub date: NaiveDate,
    /// Alignment filler before the first day or after the last day is out of
    /// range; it is never done and never clickable.
    pub in_range: bool,
    pub done: bool,
    pub today: bool,
}

impl YearCell {
    pub fn is_interactive(&self) -> bool {
        self.in_range
    }

    pub fn tooltip(&self) -> Option<String> {
        if !self.in_range {
            return None;
        }
        let status = if self.done { "Done" } else { "Missed" };
        Some(format!("{} - {}", format_date(self.date), status))
    }
}

/// Monday-first week columns, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearGrid {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub columns: Vec<[YearCell; 7]>,
}

impl YearGrid {
    pub fn cells(&self) -> impl Iterator<Item = &YearCell> {
        self.columns.iter().flatten()
    }

    pub fn in_range_count(&self) -> usize {
        self.cells().filter(|cell| cell.in_range).count()
    }

    pub fn done_count(&self) -> usize {
        self.cells().filter(|cell| cell.done).count()
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&YearCell> {
        self.cells().find(|cell| cell.date == date)
    }
}

/// Builds the heatmap ending at the later of `today` and the newest
/// completion, so future-dated completions are never cut off.
pub fn build_year_grid(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> YearGrid {
    // Keep the aligned start and the padded tail inside chrono's date range.
    let floor = NaiveDate::MIN + Duration::days(YEAR_SPAN_DAYS + 7);
    let ceiling = NaiveDate::MAX - Duration::days(7);
    let end = dates
        .last()
        .map_or(today, |&latest| latest.max(today))
        .clamp(floor, ceiling);
    let start = end - Duration::days(YEAR_SPAN_DAYS);
    let first = monday_on_or_before(start);

    // Round up to whole weeks; trailing days past `end` are filler.
    let span = (end - first).num_days() + 1;
    let column_count = (span + 6) / 7;

    let columns: Vec<[YearCell; 7]> = (0..column_count)
        .map(|column| {
            std::array::from_fn(|row| {
                let date = first + Duration::days(column * 7 + row as i64);
                let in_range = date >= start && date <= end;
                YearCell {
                    date,
                    in_range,
                    done: in_range && dates.contains(&date),
                    today: date == today,
                }
            })
        })
        .collect();

    YearGrid {
        start,
        end,
        columns,
    }
}
