use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, error, info, instrument};

use crate::{
    habit::{decode_document, encode_habits, Habit, IconCatalog},
    notifications::{StoreEvent, StoreListener},
    storage::{HabitStorage, JsonFileStorage, StorageError},
};

/// Owns the habit collection and writes it through to storage after every
/// change. Storage failures are logged, not returned.
pub struct HabitStore {
    storage: Box<dyn HabitStorage>,
    icons: IconCatalog,
    habits: Vec<Habit>,
    listeners: Vec<Box<dyn StoreListener>>,
}

pub struct HabitStoreBuilder {
    storage: Option<Box<dyn HabitStorage>>,
    icons: IconCatalog,
    listeners: Vec<Box<dyn StoreListener>>,
}

impl HabitStoreBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            icons: IconCatalog::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_storage(mut self, storage: impl HabitStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.with_storage(JsonFileStorage::new(path))
    }

    pub fn with_icons(mut self, icons: IconCatalog) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_listener(mut self, listener: impl StoreListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Without an explicit storage the per-user default file is used.
    pub fn build(self) -> Result<HabitStore, StorageError> {
        let storage: Box<dyn HabitStorage> = match self.storage {
            Some(storage) => storage,
            None => Box::new(JsonFileStorage::at_default_location()?),
        };
        let mut store = HabitStore {
            storage,
            icons: self.icons,
            habits: Vec::new(),
            listeners: self.listeners,
        };
        store.load();
        Ok(store)
    }
}

impl Default for HabitStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitStore {
    pub fn builder() -> HabitStoreBuilder {
        HabitStoreBuilder::new()
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut store = Self {
            storage: Box::new(JsonFileStorage::new(path)),
            icons: IconCatalog::default(),
            habits: Vec::new(),
            listeners: Vec::new(),
        };
        store.load();
        store
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn is_done(&self, id: &str, date: NaiveDate) -> bool {
        self.get(id).is_some_and(|habit| habit.is_done(date))
    }

    pub fn len(&self) -> usize {
        self.habits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }

    pub fn icons(&self) -> &IconCatalog {
        &self.icons
    }

    pub fn storage_location(&self) -> String {
        self.storage.describe()
    }

    pub fn subscribe(&mut self, listener: impl StoreListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Unreadable or malformed documents load as an empty collection.
    pub fn load(&mut self) -> &[Habit] {
        let decoded = match self.storage.read() {
            Ok(Some(raw)) => decode_document(&raw, &self.icons),
            Ok(None) => {
                debug!(location = %self.storage.describe(), "no habit file yet");
                Default::default()
            }
            Err(err) => {
                error!(%err, "failed to load habits file");
                Default::default()
            }
        };
        self.habits = decoded.habits;
        // Minted ids must survive the next load.
        if !decoded.assigned_ids.is_empty() {
            info!(
                assigned = decoded.assigned_ids.len(),
                "writing back ids assigned during load"
            );
            self.save();
        }
        info!(
            count = self.habits.len(),
            location = %self.storage.describe(),
            "habits loaded"
        );
        self.emit(StoreEvent::Loaded {
            count: self.habits.len(),
        });
        &self.habits
    }

    pub fn save(&self) {
        let result = encode_habits(&self.habits)
            .map_err(StorageError::from)
            .and_then(|contents| self.storage.write(&contents));
        match result {
            Ok(()) => debug!(count = self.habits.len(), "habits saved"),
            Err(err) => error!(%err, "failed to save habits file"),
        }
    }

    /// Prepends a new habit. Returns `None` for an empty or whitespace name.
    #[instrument(skip(self))]
    pub fn add(&mut self, name: &str, icon: &str) -> Option<Habit> {
        let name = name.trim();
        if name.is_empty() {
            debug!("refusing to add a habit without a name");
            return None;
        }
        let habit = Habit::new(name.to_string(), self.icons.resolve(icon));
        self.habits.insert(0, habit.clone());
        self.commit(StoreEvent::Added {
            id: habit.id.clone(),
        });
        Some(habit)
    }

    #[instrument(skip(self))]
    pub fn rename(&mut self, id: &str, name: &str, icon: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            debug!("refusing to rename a habit to an empty name");
            return false;
        }
        let icon = self.icons.resolve(icon);
        let Some(habit) = self.habits.iter_mut().find(|habit| habit.id == id) else {
            debug!("rename of unknown habit ignored");
            return false;
        };
        if habit.name == name && habit.icon == icon {
            return false;
        }
        habit.name = name.to_string();
        habit.icon = icon;
        self.commit(StoreEvent::Updated { id: id.to_string() });
        true
    }

    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.habits.len();
        self.habits.retain(|habit| habit.id != id);
        if self.habits.len() == before {
            debug!("removal of unknown habit ignored");
            return false;
        }
        self.commit(StoreEvent::Removed { id: id.to_string() });
        true
    }

    /// Returns whether membership changed.
    #[instrument(skip(self))]
    pub fn set_completion(&mut self, id: &str, date: NaiveDate, done: bool) -> bool {
        let Some(habit) = self.habits.iter_mut().find(|habit| habit.id == id) else {
            debug!("completion change for unknown habit ignored");
            return false;
        };
        let changed = if done {
            habit.dates.insert(date)
        } else {
            habit.dates.remove(&date)
        };
        if changed {
            self.commit(StoreEvent::CompletionChanged {
                id: id.to_string(),
                date,
                done,
            });
        }
        changed
    }

    /// Flips `date` and returns the new state, or `None` for an unknown id.
    #[instrument(skip(self))]
    pub fn toggle_completion(&mut self, id: &str, date: NaiveDate) -> Option<bool> {
        let done = !self.get(id)?.is_done(date);
        self.set_completion(id, date, done);
        Some(done)
    }

    fn commit(&self, event: StoreEvent) {
        self.save();
        self.emit(event);
    }

    fn emit(&self, event: StoreEvent) {
        for listener in &self.listeners {
            listener.on_change(&event);
        }
    }
}
