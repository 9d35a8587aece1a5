use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::date::parse_date;

pub const DEFAULT_ICON: &str = "emblem-ok-symbolic";

pub const ICON_CHOICES: &[&str] = &[
    "emblem-ok-symbolic",
    "weather-clear-symbolic",
    "weather-clear-night-symbolic",
    "emoji-food-symbolic",
    "emoji-nature-symbolic",
    "emoji-activities-symbolic",
    "emoji-travel-symbolic",
    "accessories-text-editor-symbolic",
    "audio-headphones-symbolic",
    "face-smile-symbolic",
    "starred-symbolic",
    "alarm-symbolic",
];

/// A tracked habit and the days it was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub dates: BTreeSet<NaiveDate>,
    /// Fields written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Habit {
    pub(crate) fn new(name: String, icon: String) -> Self {
        Self {
            id: new_habit_id(),
            name,
            icon,
            dates: BTreeSet::new(),
            extra: Map::new(),
        }
    }

    pub fn is_done(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

pub fn new_habit_id() -> String {
    Uuid::new_v4().to_string()
}

/// The allowed icon identifiers and the fallback used for anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconCatalog {
    choices: Vec<String>,
    fallback: String,
}

impl IconCatalog {
    /// The fallback is always a member of the catalog; it is prepended when
    /// `choices` does not list it.
    pub fn new<I, S>(choices: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fallback = fallback.into().trim().to_string();
        if fallback.is_empty() {
            fallback = DEFAULT_ICON.to_string();
        }
        let mut known: Vec<String> = Vec::new();
        for choice in choices {
            let choice = choice.into().trim().to_string();
            if !choice.is_empty() && !known.contains(&choice) {
                known.push(choice);
            }
        }
        if !known.contains(&fallback) {
            known.insert(0, fallback.clone());
        }
        Self {
            choices: known,
            fallback,
        }
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn contains(&self, icon: &str) -> bool {
        self.choices.iter().any(|choice| choice == icon.trim())
    }

    pub fn resolve(&self, icon: &str) -> String {
        let icon = icon.trim();
        if self.contains(icon) {
            icon.to_string()
        } else {
            self.fallback.clone()
        }
    }

    /// The choice after `icon`, wrapping around. Unknown icons restart at the
    /// first choice.
    pub fn next(&self, icon: &str) -> &str {
        let current = self
            .choices
            .iter()
            .position(|choice| choice == icon.trim())
            .unwrap_or(0);
        &self.choices[(current + 1) % self.choices.len()]
    }
}

impl Default for IconCatalog {
    fn default() -> Self {
        Self::new(ICON_CHOICES.iter().copied(), DEFAULT_ICON)
    }
}

#[derive(Debug, Default)]
pub struct DecodedHabits {
    pub habits: Vec<Habit>,
    /// Ids minted for records that had none. They only stick once written
    /// back.
    pub assigned_ids: Vec<String>,
}

/// Decodes the persisted document into normalized habits.
///
/// Never fails: anything that is not a JSON array decodes to no habits, and
/// malformed fields inside a record fall back to their defaults.
pub fn decode_document(raw: &str, icons: &IconCatalog) -> DecodedHabits {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "habit document is not valid JSON, starting empty");
            return DecodedHabits::default();
        }
    };
    let Value::Array(records) = parsed else {
        warn!("habit document is not a JSON array, starting empty");
        return DecodedHabits::default();
    };
    let mut decoded = DecodedHabits::default();
    for (index, record) in records.into_iter().enumerate() {
        if let Some(habit) = decode_record(index, record, icons, &mut decoded.assigned_ids) {
            decoded.habits.push(habit);
        }
    }
    decoded
}

pub fn decode_habits(raw: &str, icons: &IconCatalog) -> Vec<Habit> {
    decode_document(raw, icons).habits
}

fn decode_record(
    index: usize,
    record: Value,
    icons: &IconCatalog,
    assigned_ids: &mut Vec<String>,
) -> Option<Habit> {
    let Value::Object(mut fields) = record else {
        warn!(index, "skipping habit record that is not an object");
        return None;
    };

    let id = match fields.remove("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => {
            let id = new_habit_id();
            warn!(index, habit_id = %id, "habit record has no usable id, assigned a fresh one");
            assigned_ids.push(id.clone());
            id
        }
    };

    let name = match fields.remove("name") {
        Some(Value::String(name)) => name,
        _ => String::new(),
    };

    let icon = match fields.remove("icon") {
        Some(Value::String(icon)) => icons.resolve(&icon),
        _ => icons.fallback().to_string(),
    };

    let dates = match fields.remove("dates") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let date = entry.as_str().and_then(parse_date);
                if date.is_none() {
                    warn!(habit_id = %id, %entry, "dropping unreadable completion date");
                }
                date
            })
            .collect(),
        Some(other) => {
            warn!(habit_id = %id, %other, "completion dates are not a list, resetting");
            BTreeSet::new()
        }
        None => BTreeSet::new(),
    };

    Some(Habit {
        id,
        name,
        icon,
        dates,
        extra: fields,
    })
}

/// Pretty-printed JSON array, the on-disk form of the collection.
pub fn encode_habits(habits: &[Habit]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(habits)
}
