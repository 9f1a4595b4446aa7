use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::alarm::{AlarmState, EventId};
use crate::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub alarm: AlarmState,
}

impl Event {
    pub fn new(title: &str, begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            id: EventId::new(),
            title: title.to_owned(),
            description: None,
            begin,
            end,
            alarm: AlarmState::default(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_owned();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    pub fn with_alarm(mut self, alarm: AlarmState) -> Self {
        self.alarm = alarm;
        self
    }

    pub fn duration(&self) -> Duration {
        self.end - self.begin
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidEvent,
                &format!("event '{}' has no title", self.id),
            ));
        }

        if self.end < self.begin {
            return Err(Error::new(
                ErrorKind::InvalidEvent,
                &format!("event '{}' ends before it begins", self.title),
            ));
        }

        Ok(())
    }

    /// Half-open overlap test against `[range.start, range.end)`.
    ///
    /// Events without duration are treated as instants and match when they
    /// fall inside the range.
    pub fn overlaps(&self, range: &Range<DateTime<Utc>>) -> bool {
        if self.begin == self.end {
            range.start <= self.begin && self.begin < range.end
        } else {
            self.begin < range.end && range.start < self.end
        }
    }

    /// Alarm intent of this event. An enabled alarm without an explicit fire
    /// time goes off `headsup` before the event begins.
    pub fn desired_alarm(&self, headsup: Duration) -> AlarmState {
        match (self.alarm.enabled, self.alarm.fire_time) {
            (true, None) => AlarmState::at(self.begin - headsup),
            _ => self.alarm.clone(),
        }
    }
}
