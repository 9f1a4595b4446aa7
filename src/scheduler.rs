use chrono::Duration;
use chrono_tz::Tz;
use std::collections::BTreeSet;

use crate::alarm::{reconcile, AlarmAction, AlarmState, EventId};
use crate::error::Error;
use crate::event::Event;
use crate::notify::Notifier;
use crate::store::EventStore;

/// Result of bringing one event's alarm in line with the notifier.
#[derive(Debug)]
pub struct AlarmOutcome {
    pub event_id: EventId,
    pub action: AlarmAction,
    /// Set when the notifier refused the action. The event itself is left
    /// untouched and the next sync retries.
    pub error: Option<Error>,
}

impl AlarmOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct AlarmScheduler<N: Notifier> {
    notifier: N,
    headsup: Duration,
    tz: Tz,
}

impl<N: Notifier> AlarmScheduler<N> {
    pub fn new(notifier: N, headsup: Duration, tz: Tz) -> Self {
        AlarmScheduler {
            notifier,
            headsup,
            tz,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Notification text for `event`: the title on the first line, time and
    /// description below.
    pub fn message(&self, event: &Event) -> String {
        let begin = event.begin.with_timezone(&self.tz);
        let end = event.end.with_timezone(&self.tz);

        let mut message = event.title.clone();
        message += "\n";
        if begin.date_naive() == end.date_naive() {
            message += &format!(
                "{} {}-{}",
                begin.format("%Y-%m-%d"),
                begin.format("%H:%M"),
                end.format("%H:%M")
            );
        } else {
            message += &format!(
                "{}-{}",
                begin.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M")
            );
        }
        if let Some(description) = &event.description {
            message += "\n";
            message += description;
        }
        message
    }

    /// Reconciles the alarm of a saved event.
    pub fn sync_event(&mut self, event: &Event) -> AlarmOutcome {
        let desired = event.desired_alarm(self.headsup);
        let message = self.message(event);
        self.apply(&event.id, &desired, &message)
    }

    /// Reconciles the alarm of an event that no longer exists.
    pub fn sync_removed(&mut self, event_id: &str) -> AlarmOutcome {
        self.apply(event_id, &AlarmState::disabled(), "")
    }

    /// Reconciles every event of `store` and cancels alarms of events that
    /// vanished from it. Only outcomes that changed something or failed are
    /// returned.
    pub fn sync_store<S: EventStore + ?Sized>(&mut self, store: &S) -> Vec<AlarmOutcome> {
        let mut seen = BTreeSet::new();
        let mut outcomes = Vec::new();

        for event in store.events() {
            seen.insert(event.id.clone());
            outcomes.push(self.sync_event(event));
        }

        let orphaned = self
            .notifier
            .scheduled_alarms()
            .into_iter()
            .filter(|alarm| !seen.contains(&alarm.event_id))
            .map(|alarm| alarm.event_id)
            .collect::<Vec<_>>();

        for event_id in orphaned {
            outcomes.push(self.sync_removed(&event_id));
        }

        outcomes
            .into_iter()
            .filter(|outcome| outcome.action != AlarmAction::Noop || !outcome.is_ok())
            .collect()
    }

    fn apply(&mut self, event_id: &str, desired: &AlarmState, message: &str) -> AlarmOutcome {
        let current = self.notifier.scheduled(event_id);
        let action = reconcile(current.as_ref(), desired);

        let result = match action {
            // fire time unchanged, but title or time of the event may be
            AlarmAction::Noop if current.is_some() => {
                self.notifier.update_message(event_id, message)
            }
            AlarmAction::Noop => Ok(()),
            AlarmAction::Schedule(fire_time) => {
                self.notifier.schedule(event_id, fire_time, message)
            }
            AlarmAction::Cancel => self.notifier.cancel(event_id),
            AlarmAction::CancelThenSchedule(fire_time) => self
                .notifier
                .cancel(event_id)
                .and_then(|_| self.notifier.schedule(event_id, fire_time, message)),
        };

        let error = match result {
            Ok(()) => {
                if action != AlarmAction::Noop {
                    log::info!("Alarm of event {}: {:?}", event_id, action);
                }
                None
            }
            Err(err) => {
                log::warn!("Could not update alarm of event {}: {}", event_id, err);
                Some(err)
            }
        };

        AlarmOutcome {
            event_id: event_id.to_owned(),
            action,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::ScheduledAlarm;
    use crate::error::{ErrorKind, Result};
    use crate::notify::AlarmQueue;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 12, hour, minute, 0).unwrap()
    }

    fn scheduler() -> AlarmScheduler<AlarmQueue> {
        AlarmScheduler::new(
            AlarmQueue::new(Duration::minutes(15)),
            Duration::minutes(10),
            Tz::UTC,
        )
    }

    fn dentist() -> Event {
        Event::new("Dentist", at(9, 0), at(10, 0))
            .with_id("dentist")
            .with_alarm(AlarmState::at(at(8, 30)))
    }

    #[test]
    fn follows_event_edits() {
        let mut scheduler = scheduler();
        let mut event = dentist();

        let outcome = scheduler.sync_event(&event);
        assert_eq!(outcome.action, AlarmAction::Schedule(at(8, 30)));
        assert!(outcome.is_ok());

        assert_eq!(scheduler.sync_event(&event).action, AlarmAction::Noop);

        event.alarm = AlarmState::at(at(8, 45));
        assert_eq!(
            scheduler.sync_event(&event).action,
            AlarmAction::CancelThenSchedule(at(8, 45))
        );
        assert_eq!(
            scheduler.notifier().scheduled("dentist").unwrap().fire_time,
            at(8, 45)
        );

        event.alarm.enabled = false;
        assert_eq!(scheduler.sync_event(&event).action, AlarmAction::Cancel);
        assert!(scheduler.notifier().is_empty());
    }

    #[test]
    fn refreshes_text_of_unchanged_alarm() {
        let mut scheduler = scheduler();
        let mut event = dentist();
        scheduler.sync_event(&event);

        event.title = "Dentist moved room".to_owned();
        event.begin = at(9, 15);
        let outcome = scheduler.sync_event(&event);
        assert_eq!(outcome.action, AlarmAction::Noop);
        assert!(outcome.is_ok());

        let due = scheduler.notifier_mut().pop_due(at(8, 30));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message, "Dentist moved room\n2024-02-12 09:15-10:00");
    }

    #[test]
    fn uses_headsup_without_fire_time() {
        let mut scheduler = scheduler();
        let event = dentist().with_alarm(AlarmState::new(true, None));
        assert_eq!(
            scheduler.sync_event(&event).action,
            AlarmAction::Schedule(at(8, 50))
        );
    }

    #[test]
    fn store_sync_cancels_orphans() {
        let mut scheduler = scheduler();
        let mut store = MemoryStore::new();
        store.create(dentist()).unwrap();
        store
            .create(Event::new("Lunch", at(12, 0), at(13, 0)).with_id("lunch"))
            .unwrap();

        let outcomes = scheduler.sync_store(&store);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].event_id, "dentist");

        assert!(scheduler.sync_store(&store).is_empty());

        store.delete("dentist").unwrap();
        let outcomes = scheduler.sync_store(&store);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].action, AlarmAction::Cancel);
        assert!(scheduler.notifier().is_empty());
    }

    #[test]
    fn message_contains_local_time() {
        let scheduler = AlarmScheduler::new(
            AlarmQueue::new(Duration::minutes(15)),
            Duration::minutes(10),
            chrono_tz::Europe::Berlin,
        );
        let event = dentist().with_description("Bring card");
        assert_eq!(
            scheduler.message(&event),
            "Dentist\n2024-02-12 10:00-11:00\nBring card"
        );

        let event = Event::new("Trip", at(9, 0), at(9, 0) + Duration::days(2));
        assert_eq!(
            scheduler.message(&event),
            "Trip\n2024-02-12 10:00-2024-02-14 10:00"
        );
    }

    /// Notifier that refuses to schedule anything.
    #[derive(Default)]
    struct DeniedNotifier {
        alarms: BTreeMap<EventId, ScheduledAlarm>,
    }

    impl Notifier for DeniedNotifier {
        fn schedule(&mut self, _: &str, _: DateTime<Utc>, _: &str) -> Result<()> {
            Err(Error::new(ErrorKind::Notification, "permission denied"))
        }

        fn cancel(&mut self, event_id: &str) -> Result<()> {
            self.alarms.remove(event_id);
            Ok(())
        }

        fn update_message(&mut self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        fn scheduled(&self, event_id: &str) -> Option<ScheduledAlarm> {
            self.alarms.get(event_id).cloned()
        }

        fn scheduled_alarms(&self) -> Vec<ScheduledAlarm> {
            self.alarms.values().cloned().collect()
        }
    }

    #[test]
    fn notifier_failures_are_reported_not_fatal() {
        let mut scheduler =
            AlarmScheduler::new(DeniedNotifier::default(), Duration::minutes(10), Tz::UTC);
        let event = dentist();

        let outcome = scheduler.sync_event(&event);
        assert_eq!(outcome.action, AlarmAction::Schedule(at(8, 30)));
        assert!(matches!(
            outcome.error.as_ref().map(|e| &e.kind),
            Some(ErrorKind::Notification)
        ));
        assert_eq!(event.alarm, AlarmState::at(at(8, 30)));

        // nothing got scheduled, so the next sync tries again
        let outcome = scheduler.sync_event(&event);
        assert_eq!(outcome.action, AlarmAction::Schedule(at(8, 30)));
        assert!(!outcome.is_ok());
    }
}
