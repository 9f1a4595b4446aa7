use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

pub type EventId = String;

/// Alarm configuration an event asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct AlarmState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fire_time: Option<DateTime<Utc>>,
}

impl AlarmState {
    pub fn at(fire_time: DateTime<Utc>) -> Self {
        AlarmState {
            enabled: true,
            fire_time: Some(fire_time),
        }
    }

    pub fn disabled() -> Self {
        AlarmState::default()
    }

    /// The fire time, if the alarm is switched on and has one.
    pub fn active_fire_time(&self) -> Option<DateTime<Utc>> {
        if self.enabled {
            self.fire_time
        } else {
            None
        }
    }
}

/// A notification registration that is currently active for an event.
#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct ScheduledAlarm {
    pub event_id: EventId,
    pub fire_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    Noop,
    Schedule(DateTime<Utc>),
    Cancel,
    CancelThenSchedule(DateTime<Utc>),
}

impl AlarmAction {
    pub fn cancels(&self) -> bool {
        matches!(self, AlarmAction::Cancel | AlarmAction::CancelThenSchedule(_))
    }

    pub fn schedules(&self) -> Option<DateTime<Utc>> {
        match self {
            AlarmAction::Schedule(t) | AlarmAction::CancelThenSchedule(t) => Some(*t),
            AlarmAction::Noop | AlarmAction::Cancel => None,
        }
    }
}

/// Decides how to bring the scheduled alarm of an event in line with the
/// desired alarm state. Fire times compare by exact equality.
pub fn reconcile(current: Option<&ScheduledAlarm>, desired: &AlarmState) -> AlarmAction {
    match (current, desired.active_fire_time()) {
        (None, None) => AlarmAction::Noop,
        (None, Some(fire_time)) => AlarmAction::Schedule(fire_time),
        (Some(_), None) => AlarmAction::Cancel,
        (Some(scheduled), Some(fire_time)) if scheduled.fire_time == fire_time => {
            AlarmAction::Noop
        }
        (Some(_), Some(fire_time)) => AlarmAction::CancelThenSchedule(fire_time),
    }
}
