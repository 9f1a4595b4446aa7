use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::alarm::{EventId, ScheduledAlarm};
use crate::error::{Error, ErrorKind, Result};

/// Registration and removal of alarm notifications.
pub trait Notifier {
    fn schedule(&mut self, event_id: &str, fire_time: DateTime<Utc>, message: &str) -> Result<()>;
    fn cancel(&mut self, event_id: &str) -> Result<()>;
    /// Replaces the text of a registered alarm without touching its fire time.
    fn update_message(&mut self, event_id: &str, message: &str) -> Result<()>;
    fn scheduled(&self, event_id: &str) -> Option<ScheduledAlarm>;
    fn scheduled_alarms(&self) -> Vec<ScheduledAlarm>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarm {
    pub event_id: EventId,
    pub fire_time: DateTime<Utc>,
    pub message: String,
    delivered: bool,
}

impl PendingAlarm {
    pub fn delivered(&self) -> bool {
        self.delivered
    }
}

/// In-process alarm registry.
///
/// Alarms stay registered after they went off, so an unchanged alarm is not
/// handed out a second time. Alarms that are overdue by more than the grace
/// period are dropped with an info log line instead of being delivered late.
#[derive(Debug, Clone)]
pub struct AlarmQueue {
    alarms: BTreeMap<EventId, PendingAlarm>,
    grace: Duration,
}

impl AlarmQueue {
    pub fn new(grace: Duration) -> Self {
        AlarmQueue {
            alarms: BTreeMap::new(),
            grace,
        }
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Fire time of the earliest alarm that has not gone off yet.
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.alarms
            .values()
            .filter(|alarm| !alarm.delivered)
            .map(|alarm| alarm.fire_time)
            .min()
    }

    /// Takes every alarm due at `now`, ordered by fire time.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<PendingAlarm> {
        let grace = self.grace;
        let mut due: Vec<PendingAlarm> = self
            .alarms
            .values_mut()
            .filter(|alarm| !alarm.delivered && alarm.fire_time <= now)
            .filter_map(|alarm| {
                alarm.delivered = true;
                if now - alarm.fire_time > grace {
                    log::info!(
                        "Skipping alarm of event {} missed at {}",
                        alarm.event_id,
                        alarm.fire_time
                    );
                    None
                } else {
                    Some(alarm.clone())
                }
            })
            .collect();

        due.sort_by_key(|alarm| alarm.fire_time);
        due
    }
}

impl Notifier for AlarmQueue {
    fn schedule(&mut self, event_id: &str, fire_time: DateTime<Utc>, message: &str) -> Result<()> {
        log::debug!("Scheduling alarm of event {} at {}", event_id, fire_time);
        self.alarms.insert(
            event_id.to_owned(),
            PendingAlarm {
                event_id: event_id.to_owned(),
                fire_time,
                message: message.to_owned(),
                delivered: false,
            },
        );
        Ok(())
    }

    fn cancel(&mut self, event_id: &str) -> Result<()> {
        log::debug!("Cancelling alarm of event {}", event_id);
        self.alarms.remove(event_id);
        Ok(())
    }

    fn update_message(&mut self, event_id: &str, message: &str) -> Result<()> {
        let alarm = self.alarms.get_mut(event_id).ok_or_else(|| {
            Error::new(ErrorKind::EventNotFound, &format!("no alarm of event {}", event_id))
        })?;

        if alarm.message != message {
            log::debug!("Updating alarm text of event {}", event_id);
            alarm.message = message.to_owned();
        }
        Ok(())
    }

    fn scheduled(&self, event_id: &str) -> Option<ScheduledAlarm> {
        self.alarms
            .get(event_id)
            .map(|alarm| ScheduledAlarm::new(alarm.event_id.clone(), alarm.fire_time))
    }

    fn scheduled_alarms(&self) -> Vec<ScheduledAlarm> {
        self.alarms
            .values()
            .map(|alarm| ScheduledAlarm::new(alarm.event_id.clone(), alarm.fire_time))
            .collect()
    }
}

/// Shows `alarm` as desktop notification.
pub fn deliver(alarm: &PendingAlarm, timeout: Duration) -> Result<()> {
    let mut lines = alarm.message.splitn(2, '\n');
    let summary = lines.next().unwrap_or_default();
    let body = lines.next().unwrap_or_default();

    notify_rust::Notification::new()
        .appname("datebook")
        .summary(summary)
        .body(body)
        .timeout(notify_rust::Timeout::Milliseconds(
            timeout.num_milliseconds().max(0) as u32,
        ))
        .show()
        .map(|_handle| ())
        .map_err(|e| {
            Error::new(
                ErrorKind::Notification,
                &format!("event {}: {}", alarm.event_id, e),
            )
        })
}
