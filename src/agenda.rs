use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::ops::Range;

use crate::error::Result;
use crate::event::Event;
use crate::month::CalendarMonth;
use crate::store::EventStore;

// DST gaps are searched in quarter hours for up to one day
const GAP_STEP_MINUTES: i64 = 15;
const MAX_GAP_STEPS: i64 = 24 * 60 / GAP_STEP_MINUTES;

/// Day and month queries over an event store, evaluated in a fixed time zone.
pub struct Agenda<S: EventStore> {
    store: S,
    tz: Tz,
}

impl<S: EventStore> Agenda<S> {
    pub fn new(store: S, tz: Tz) -> Self {
        Agenda { store, tz }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn tz(&self) -> &Tz {
        &self.tz
    }

    /// Start of `date` in the agenda's time zone as UTC instant. Where a DST
    /// change skips local midnight the day starts at the first local time
    /// after the gap.
    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        (0..=MAX_GAP_STEPS)
            .map(|step| midnight + Duration::minutes(GAP_STEP_MINUTES * step))
            .find_map(|naive| self.tz.from_local_datetime(&naive).earliest())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| {
                log::warn!("No local midnight of {} in {:?}", date, self.tz);
                Utc.from_utc_datetime(&midnight)
            })
    }

    pub fn day_range(&self, date: NaiveDate) -> Range<DateTime<Utc>> {
        let begin = self.local_midnight(date);
        let end = date
            .succ_opt()
            .map(|next| self.local_midnight(next))
            .unwrap_or_else(|| begin + Duration::days(1));
        begin..end
    }

    pub fn month_range(&self, month: &CalendarMonth) -> Result<Range<DateTime<Utc>>> {
        let first = month.date(1)?;
        let last = month.date(month.days())?;
        Ok(self.day_range(first).start..self.day_range(last).end)
    }

    pub fn events_of_day(&self, date: NaiveDate) -> impl Iterator<Item = &Event> {
        self.store.events_in(self.day_range(date))
    }

    pub fn events_of_month(&self, month: &CalendarMonth) -> Result<impl Iterator<Item = &Event>> {
        Ok(self.store.events_in(self.month_range(month)?))
    }

    /// Days of `month` with at least one event, in ascending order.
    pub fn busy_days(&self, month: &CalendarMonth) -> Result<Vec<u32>> {
        let events = self.events_of_month(month)?.collect::<Vec<_>>();

        let mut busy = Vec::new();
        for day in 1..=month.days() {
            let range = self.day_range(month.date(day)?);
            if events.iter().any(|event| event.overlaps(&range)) {
                busy.push(day);
            }
        }

        Ok(busy)
    }
}
