pub mod app;

pub use crate::app::{AppConfig, HabitBoard};
