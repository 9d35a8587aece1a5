pub mod calendar;
pub mod date;
pub mod habit;
pub mod notifications;
pub mod storage;
pub mod store;

pub use crate::habit::{Habit, IconCatalog};
pub use crate::store::{HabitStore, HabitStoreBuilder};
