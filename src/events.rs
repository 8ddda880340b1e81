//! Structured garden events and the sinks that receive them.
//!
//! Every state-changing occurrence in the garden is described by a
//! [`GardenEvent`]. The engine owns one [`EventSink`] (usually a
//! [`FanoutSink`] over a [`TracingSink`] and a [`MemorySink`]) and hands
//! entities and modules a tick-stamped [`Emitter`] for it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Plant,
    Insect,
    Watering,
    Heating,
    PestControl,
    Lighting,
    Sensor,
    Garden,
    UserAction,
    Application,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Plant,
        Category::Insect,
        Category::Watering,
        Category::Heating,
        Category::PestControl,
        Category::Lighting,
        Category::Sensor,
        Category::Garden,
        Category::UserAction,
        Category::Application,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Plant => "PLANT",
            Category::Insect => "INSECT",
            Category::Watering => "WATERING",
            Category::Heating => "HEATING",
            Category::PestControl => "PEST_CONTROL",
            Category::Lighting => "LIGHTING",
            Category::Sensor => "SENSOR",
            Category::Garden => "GARDEN",
            Category::UserAction => "USER_ACTION",
            Category::Application => "APPLICATION",
        }
    }

    pub fn parse(value: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenEvent {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: Category,
    pub message: String,
}

impl fmt::Display for GardenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [tick {}] [{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.tick,
            self.level,
            self.category,
            self.message
        )
    }
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: GardenEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn record(&self, event: GardenEvent) {
        (**self).record(event);
    }
}

/// Tick-stamped front end over a sink.
#[derive(Clone, Copy)]
pub struct Emitter<'a> {
    sink: &'a dyn EventSink,
    tick: u64,
}

impl<'a> Emitter<'a> {
    pub fn new(sink: &'a dyn EventSink, tick: u64) -> Self {
        Self { sink, tick }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn emit(&self, level: Level, category: Category, message: impl Into<String>) {
        self.sink.record(GardenEvent {
            tick: self.tick,
            timestamp: Utc::now(),
            level,
            category,
            message: message.into(),
        });
    }

    pub fn info(&self, category: Category, message: impl Into<String>) {
        self.emit(Level::Info, category, message);
    }

    pub fn warn(&self, category: Category, message: impl Into<String>) {
        self.emit(Level::Warn, category, message);
    }

    pub fn error(&self, category: Category, message: impl Into<String>) {
        self.emit(Level::Error, category, message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: GardenEvent) {}
}

/// Forwards events to `tracing` with the category and tick as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: GardenEvent) {
        let category = event.category.as_str();
        match event.level {
            Level::Info => tracing::info!(category, tick = event.tick, "{}", event.message),
            Level::Warn => tracing::warn!(category, tick = event.tick, "{}", event.message),
            Level::Error => tracing::error!(category, tick = event.tick, "{}", event.message),
        }
    }
}

pub const DEFAULT_JOURNAL_CAPACITY: usize = 50_000;

/// Bounded in-memory journal; the oldest entries are dropped first.
pub struct MemorySink {
    capacity: usize,
    entries: Mutex<VecDeque<GardenEvent>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut VecDeque<GardenEvent>) -> T) -> T {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<GardenEvent> {
        self.with_entries(|entries| entries.iter().cloned().collect())
    }

    /// The newest `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<GardenEvent> {
        self.with_entries(|entries| {
            let skip = entries.len().saturating_sub(limit);
            entries.iter().skip(skip).cloned().collect()
        })
    }

    pub fn by_category(&self, category: Category) -> Vec<GardenEvent> {
        self.filtered(|event| event.category == category)
    }

    pub fn by_level(&self, level: Level) -> Vec<GardenEvent> {
        self.filtered(|event| event.level == level)
    }

    pub fn filtered(&self, predicate: impl Fn(&GardenEvent) -> bool) -> Vec<GardenEvent> {
        self.with_entries(|entries| entries.iter().filter(|e| predicate(e)).cloned().collect())
    }

    pub fn count_matching(&self, predicate: impl Fn(&GardenEvent) -> bool) -> usize {
        self.with_entries(|entries| entries.iter().filter(|e| predicate(e)).count())
    }

    pub fn clear(&self) {
        self.with_entries(|entries| entries.clear());
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: GardenEvent) {
        let capacity = self.capacity;
        self.with_entries(|entries| {
            entries.push_back(event);
            while entries.len() > capacity {
                entries.pop_front();
            }
        });
    }
}

#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn record(&self, event: GardenEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.record(event.clone());
            }
            last.record(event);
        }
    }
}
