use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use habit_core::{
    calendar::{build_week_view, build_year_grid, YearCell},
    date::{format_date, week_dates},
    storage::{JsonFileStorage, HABITS_FILE_NAME},
    Habit, HabitStore,
};
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub(crate) data_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// `HABIT_TRACKER_FILE` wins over `HABIT_TRACKER_DATA_DIR`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABIT_TRACKER_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_file = Some(PathBuf::from(dir.trim()).join(HABITS_FILE_NAME));
        }
        if let Some(file) = lookup("HABIT_TRACKER_FILE").filter(|v| !v.trim().is_empty()) {
            config.data_file = Some(PathBuf::from(file.trim()));
        }
        config
    }

    pub fn with_data_file(mut self, path: impl AsRef<Path>) -> Self {
        self.data_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub fn resolve_data_file(&self) -> Result<PathBuf> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => JsonFileStorage::default_path()
                .context("unable to resolve the user data directory"),
        }
    }
}

/// Host-side controller: owns the store, remembers which habits are
/// expanded, and renders the week strips and heatmaps.
pub struct HabitBoard {
    store: HabitStore,
    expanded: HashSet<String>,
    today: NaiveDate,
}

impl HabitBoard {
    pub fn open(config: &AppConfig, today: NaiveDate) -> Result<Self> {
        let path = config.resolve_data_file()?;
        info!(path = %path.display(), "opening habit board");
        let store = HabitStore::builder()
            .with_file(&path)
            .build()
            .context("failed to initialize habit store")?;
        Ok(Self::from_store(store, today))
    }

    pub fn from_store(store: HabitStore, today: NaiveDate) -> Self {
        Self {
            store,
            expanded: HashSet::new(),
            today,
        }
    }

    pub fn store(&self) -> &HabitStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Accepts a full id or an unambiguous prefix of one.
    pub fn resolve_id(&self, selector: &str) -> Result<String> {
        let selector = selector.trim();
        if selector.is_empty() {
            bail!("habit id is required");
        }
        if let Some(habit) = self.store.get(selector) {
            return Ok(habit.id.clone());
        }
        let matches: Vec<&Habit> = self
            .store
            .habits()
            .iter()
            .filter(|habit| habit.id.starts_with(selector))
            .collect();
        match matches.as_slice() {
            [habit] => Ok(habit.id.clone()),
            [] => bail!("habit not found: {selector}"),
            _ => bail!("ambiguous habit id `{selector}` matches {} habits", matches.len()),
        }
    }

    pub fn add(&mut self, name: &str, icon: Option<&str>) -> Result<String> {
        let icon = icon.unwrap_or(self.store.icons().fallback()).to_string();
        let Some(habit) = self.store.add(name, &icon) else {
            bail!("habit name is required");
        };
        Ok(format!("Added \"{}\" ({})", habit.name, short_id(&habit.id)))
    }

    pub fn edit(&mut self, selector: &str, name: Option<&str>, icon: Option<&str>) -> Result<String> {
        let id = self.resolve_id(selector)?;
        let current = self.store.get(&id).context("habit disappeared")?;
        let name = name.unwrap_or(current.name.as_str()).to_string();
        let icon = icon.unwrap_or(current.icon.as_str()).to_string();
        if name.trim().is_empty() {
            bail!("habit name is required");
        }
        if self.store.rename(&id, &name, &icon) {
            Ok(format!("Updated \"{}\"", name.trim()))
        } else {
            Ok(format!("\"{}\" is unchanged", name.trim()))
        }
    }

    /// Destructive; the caller must have asked the user first.
    pub fn remove(&mut self, selector: &str, confirmed: bool) -> Result<String> {
        let id = self.resolve_id(selector)?;
        if !confirmed {
            let name = self.store.get(&id).map(|h| h.name.clone()).unwrap_or_default();
            bail!("refusing to remove \"{name}\" without confirmation (pass --yes)");
        }
        self.store.remove(&id);
        self.expanded.remove(&id);
        Ok("Removed habit".to_string())
    }

    pub fn mark(&mut self, selector: &str, date: Option<NaiveDate>, done: bool) -> Result<String> {
        let id = self.resolve_id(selector)?;
        let date = date.unwrap_or(self.today);
        self.store.set_completion(&id, date, done);
        Ok(self.completion_notice(&id, date))
    }

    pub fn toggle(&mut self, selector: &str, date: Option<NaiveDate>) -> Result<String> {
        let id = self.resolve_id(selector)?;
        let date = date.unwrap_or(self.today);
        self.store.toggle_completion(&id, date);
        Ok(self.completion_notice(&id, date))
    }

    fn completion_notice(&self, id: &str, date: NaiveDate) -> String {
        let name = self.store.get(id).map(|h| h.name.as_str()).unwrap_or_default();
        let state = if self.store.is_done(id, date) {
            "done"
        } else {
            "not done"
        };
        format!("\"{name}\" marked {state} on {}", format_date(date))
    }

    pub fn set_expanded(&mut self, selector: &str, expanded: bool) -> Result<()> {
        let id = self.resolve_id(selector)?;
        if expanded {
            self.expanded.insert(id);
        } else {
            self.expanded.remove(&id);
        }
        Ok(())
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Renders every habit. Expanded state for habits that no longer exist
    /// is dropped.
    pub fn render(&mut self) -> String {
        let known: HashSet<&str> = self.store.habits().iter().map(|h| h.id.as_str()).collect();
        self.expanded.retain(|id| known.contains(id.as_str()));

        if self.store.is_empty() {
            return "No habits yet\n".to_string();
        }
        let week = week_dates(self.today);
        let mut out = String::new();
        for habit in self.store.habits() {
            let done_today = habit.is_done(self.today);
            out.push_str(&format!(
                "[{}] {}  {}  ({})\n",
                if done_today { "x" } else { " " },
                habit.name,
                habit.icon,
                short_id(&habit.id)
            ));
            let view = build_week_view(habit, &week);
            let labels: Vec<String> = view.iter().map(|d| format!(" {} ", d.day.short)).collect();
            let marks: Vec<String> = view
                .iter()
                .map(|d| {
                    let mark = if d.done { '#' } else { '.' };
                    if d.day.is_today {
                        format!("[{mark}]")
                    } else {
                        format!(" {mark} ")
                    }
                })
                .collect();
            out.push_str(&format!("    {}\n", labels.join("")));
            out.push_str(&format!("    {}\n", marks.join("")));
            if self.expanded.contains(&habit.id) {
                out.push_str(&render_heatmap(habit, self.today));
            }
        }
        debug!(habits = self.store.len(), expanded = self.expanded.len(), "rendered board");
        out
    }

    pub fn render_year(&self, selector: &str) -> Result<String> {
        let id = self.resolve_id(selector)?;
        let habit = self.store.get(&id).context("habit disappeared")?;
        let mut out = format!("{} ({})\n", habit.name, short_id(&habit.id));
        out.push_str(&render_heatmap(habit, self.today));
        Ok(out)
    }
}

const ROW_LABELS: [&str; 7] = ["Mon", "   ", "Wed", "   ", "Fri", "   ", "Sun"];

fn heatmap_glyph(cell: &YearCell) -> char {
    match (cell.in_range, cell.done, cell.today) {
        (false, _, _) => ' ',
        (true, true, true) => '@',
        (true, false, true) => 'o',
        (true, true, false) => '#',
        (true, false, false) => '.',
    }
}

fn render_heatmap(habit: &Habit, today: NaiveDate) -> String {
    let grid = build_year_grid(&habit.dates, today);
    let mut out = String::new();
    for (row, label) in ROW_LABELS.iter().enumerate() {
        let line: String = grid.columns.iter().map(|column| heatmap_glyph(&column[row])).collect();
        out.push_str(&format!("    {label} {}\n", line.trim_end()));
    }
    out.push_str(&format!(
        "    {} .. {}: {} of {} days done\n",
        format_date(grid.start),
        format_date(grid.end),
        grid.done_count(),
        grid.in_range_count()
    ));
    out
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::storage::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn board() -> HabitBoard {
        let store = HabitStore::builder()
            .with_storage(MemoryStorage::new())
            .build()
            .unwrap();
        HabitBoard::from_store(store, date(2024, 1, 10))
    }

    #[test]
    fn config_prefers_explicit_file() {
        let config = AppConfig::from_lookup(|key| match key {
            "HABIT_TRACKER_DATA_DIR" => Some("/data".into()),
            "HABIT_TRACKER_FILE" => Some("/elsewhere/h.json".into()),
            _ => None,
        });
        assert_eq!(config.data_file(), Some(Path::new("/elsewhere/h.json")));

        let config = AppConfig::from_lookup(|key| {
            (key == "HABIT_TRACKER_DATA_DIR").then(|| "/data".to_string())
        });
        assert_eq!(config.data_file(), Some(Path::new("/data/habits.json")));

        assert!(AppConfig::from_lookup(|_| None).data_file().is_none());
    }

    #[test]
    fn add_rejects_blank_names() {
        let mut board = board();
        assert!(board.add("  ", None).is_err());
        let notice = board.add("Meditate", Some("weather-clear-symbolic")).unwrap();
        assert!(notice.starts_with("Added \"Meditate\""));
        assert_eq!(board.store().habits()[0].icon, "weather-clear-symbolic");
    }

    #[test]
    fn ids_resolve_by_prefix() {
        let mut board = board();
        board.add("Read", None).unwrap();
        let id = board.store().habits()[0].id.clone();
        assert_eq!(board.resolve_id(&id[..6]).unwrap(), id);
        assert!(board.resolve_id("zzzz").is_err());
        assert!(board.resolve_id("").is_err());
    }

    #[test]
    fn mark_defaults_to_today_and_toggle_flips() {
        let mut board = board();
        board.add("Read", None).unwrap();
        let id = board.store().habits()[0].id.clone();

        board.mark(&id, None, true).unwrap();
        assert!(board.store().is_done(&id, date(2024, 1, 10)));
        let notice = board.toggle(&id, Some(date(2024, 1, 10))).unwrap();
        assert!(notice.ends_with("marked not done on 2024-01-10"));
        assert!(!board.store().is_done(&id, date(2024, 1, 10)));
    }

    #[test]
    fn edit_keeps_unspecified_fields() {
        let mut board = board();
        board.add("Read", Some("starred-symbolic")).unwrap();
        let id = board.store().habits()[0].id.clone();
        assert_eq!(board.edit(&id, Some("Read more"), None).unwrap(), "Updated \"Read more\"");
        let habit = board.store().get(&id).unwrap();
        assert_eq!(habit.icon, "starred-symbolic");
        assert!(board.edit(&id, Some(" "), None).is_err());
    }

    #[test]
    fn removal_requires_confirmation_and_clears_expansion() {
        let mut board = board();
        board.add("Read", None).unwrap();
        let id = board.store().habits()[0].id.clone();
        board.set_expanded(&id, true).unwrap();

        assert!(board.remove(&id, false).is_err());
        assert_eq!(board.store().len(), 1);

        assert_eq!(board.remove(&id, true).unwrap(), "Removed habit");
        assert!(board.store().is_empty());
        assert!(!board.is_expanded(&id));
    }

    #[test]
    fn render_shows_week_strip_and_expanded_heatmap() {
        let mut board = board();
        assert_eq!(board.render(), "No habits yet\n");

        board.add("Read", None).unwrap();
        let id = board.store().habits()[0].id.clone();
        board.mark(&id, Some(date(2024, 1, 8)), true).unwrap();
        board.mark(&id, None, true).unwrap();

        let collapsed = board.render();
        assert!(collapsed.starts_with("[x] Read"));
        assert!(collapsed.contains(" M  T  W  T  F  S  S "));
        assert!(collapsed.contains(" #  . [#] .  .  .  . "));
        assert!(!collapsed.contains("Mon "));

        board.set_expanded(&id, true).unwrap();
        let expanded = board.render();
        assert!(expanded.contains("Mon "));
        assert!(expanded.contains("2023-01-11 .. 2024-01-10: 2 of 365 days done"));
    }

    #[test]
    fn heatmap_marks_today() {
        let mut board = board();
        board.add("Read", None).unwrap();
        let id = board.store().habits()[0].id.clone();
        let year = board.render_year(&id).unwrap();
        // Wednesday row, last column.
        let wednesday = year.lines().find(|line| line.trim_start().starts_with("Wed")).unwrap();
        assert!(wednesday.ends_with('o'));
    }
}
