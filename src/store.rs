use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::alarm::EventId;
use crate::error::{Error, ErrorKind, Result};
use crate::event::Event;

/// Keyed storage of events.
pub trait EventStore {
    /// Stores a new event and returns its id. A blank id is replaced by a
    /// freshly generated one.
    fn create(&mut self, event: Event) -> Result<EventId>;
    fn update(&mut self, event: Event) -> Result<()>;
    fn delete(&mut self, id: &str) -> Result<Event>;
    fn get(&self, id: &str) -> Option<&Event>;
    fn events(&self) -> Box<dyn Iterator<Item = &Event> + '_>;

    /// Events overlapping the half-open `range`.
    fn events_in(&self, range: Range<DateTime<Utc>>) -> Box<dyn Iterator<Item = &Event> + '_> {
        Box::new(self.events().filter(move |event| event.overlaps(&range)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: BTreeMap<EventId, Event>,
}

#[derive(Deserialize)]
struct EventsFile {
    #[serde(default, rename = "event")]
    events: Vec<Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: EventsFile = toml::from_str(content)
            .map_err(|e| Error::new(ErrorKind::EventsParse, &e.to_string()))?;

        let mut store = MemoryStore::new();
        for event in file.events {
            store.create(event)?;
        }

        Ok(store)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        MemoryStore::from_toml_str(&content).map_err(|err| {
            let msg = format!(
                "{} (in '{}')",
                err.message.as_deref().unwrap_or_default(),
                path.display()
            );
            err.with_msg(&msg)
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for MemoryStore {
    fn create(&mut self, mut event: Event) -> Result<EventId> {
        event.validate()?;

        if event.id.trim().is_empty() {
            event.id = uuid::Uuid::new_v4().hyphenated().to_string();
        }

        if self.events.contains_key(&event.id) {
            return Err(Error::new(
                ErrorKind::DuplicateEvent,
                &format!("id '{}'", event.id),
            ));
        }

        let id = event.id.clone();
        log::debug!("Storing event '{}' as {}", event.title, id);
        self.events.insert(id.clone(), event);

        Ok(id)
    }

    fn update(&mut self, event: Event) -> Result<()> {
        event.validate()?;

        match self.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event;
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::EventNotFound,
                &format!("id '{}'", event.id),
            )),
        }
    }

    fn delete(&mut self, id: &str) -> Result<Event> {
        self.events
            .remove(id)
            .ok_or_else(|| Error::new(ErrorKind::EventNotFound, &format!("id '{}'", id)))
    }

    fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    fn events(&self) -> Box<dyn Iterator<Item = &Event> + '_> {
        Box::new(self.events.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmState;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, hour, 0, 0).unwrap()
    }

    const EVENTS: &str = r#"
        [[event]]
        id = "dentist"
        title = "Dentist"
        begin = "2024-02-12T09:00:00Z"
        end = "2024-02-12T10:00:00Z"

        [event.alarm]
        enabled = true
        fire_time = "2024-02-12T08:30:00Z"

        [[event]]
        title = "Conference"
        description = "Room 4"
        begin = "2024-02-14T09:00:00Z"
        end = "2024-02-16T17:00:00Z"
    "#;

    #[test]
    fn loads_events_from_toml() {
        let store = MemoryStore::from_toml_str(EVENTS).unwrap();
        assert_eq!(store.len(), 2);

        let dentist = store.get("dentist").unwrap();
        let fire_time = Utc.with_ymd_and_hms(2024, 2, 12, 8, 30, 0).unwrap();
        assert_eq!(dentist.alarm, AlarmState::at(fire_time));

        let conference = store.events().find(|e| e.title == "Conference").unwrap();
        assert!(!conference.id.is_empty());
        assert_eq!(conference.description.as_deref(), Some("Room 4"));
        assert!(!conference.alarm.enabled);
    }

    #[test]
    fn rejects_malformed_events_file() {
        let err = MemoryStore::from_toml_str("[[event]]\ntitle = 3").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EventsParse));
    }

    #[test]
    fn create_update_delete() {
        let mut store = MemoryStore::new();
        let id = store
            .create(Event::new("Dentist", at(12, 9), at(12, 10)))
            .unwrap();
        assert!(!id.is_empty());

        let mut event = store.get(&id).unwrap().clone();
        event.end = at(12, 11);
        store.update(event).unwrap();
        assert_eq!(store.get(&id).unwrap().end, at(12, 11));

        let removed = store.delete(&id).unwrap();
        assert_eq!(removed.title, "Dentist");
        assert!(store.is_empty());
        assert!(matches!(
            store.delete(&id).unwrap_err().kind,
            ErrorKind::EventNotFound
        ));
    }

    #[test]
    fn rejects_duplicates_and_unknown_updates() {
        let mut store = MemoryStore::new();
        let event = Event::new("Dentist", at(12, 9), at(12, 10)).with_id("dentist");
        store.create(event.clone()).unwrap();

        assert!(matches!(
            store.create(event).unwrap_err().kind,
            ErrorKind::DuplicateEvent
        ));

        let unknown = Event::new("Other", at(12, 9), at(12, 10)).with_id("other");
        assert!(matches!(
            store.update(unknown).unwrap_err().kind,
            ErrorKind::EventNotFound
        ));
    }

    #[test]
    fn rejects_invalid_events() {
        let mut store = MemoryStore::new();
        let err = store
            .create(Event::new("Backwards", at(12, 10), at(12, 9)))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidEvent));
    }

    #[test]
    fn queries_by_range() {
        let store = MemoryStore::from_toml_str(EVENTS).unwrap();

        let titles = |range| {
            store
                .events_in(range)
                .map(|e| e.title.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(titles(at(12, 0)..at(13, 0)), vec!["Dentist".to_owned()]);
        assert_eq!(titles(at(15, 0)..at(16, 0)), vec!["Conference".to_owned()]);
        assert!(titles(at(13, 0)..at(14, 0)).is_empty());
        assert_eq!(titles(at(1, 0)..at(29, 0)).len(), 2);
    }
}
