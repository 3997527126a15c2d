//! In-memory cache of the server's weeks plus the current selection.

use std::{collections::HashMap, sync::Arc};

use shared::domain::{Presentation, Week, WeekId};
use tokio::sync::RwLock;

pub type SharedStore = Arc<RwLock<WeekStore>>;

#[derive(Debug, Default, Clone)]
pub struct WeekStore {
    weeks: Vec<Week>,
    selection: Option<WeekId>,
    presentations: Vec<Presentation>,
}

impl WeekStore {
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::default()))
    }

    /// Swaps in a whole collection. Repeated identifiers keep the last entry,
    /// at the position of the first.
    ///
    /// The derived presentation list is left as is until the next `select`.
    pub fn replace_all(&mut self, weeks: Vec<Week>) {
        let mut index: HashMap<WeekId, usize> = HashMap::with_capacity(weeks.len());
        let mut deduped: Vec<Week> = Vec::with_capacity(weeks.len());
        for week in weeks {
            match index.get(&week.week_id) {
                Some(&slot) => deduped[slot] = week,
                None => {
                    index.insert(week.week_id.clone(), deduped.len());
                    deduped.push(week);
                }
            }
        }
        self.weeks = deduped;
    }

    pub fn select(&mut self, week_id: WeekId) {
        self.presentations = self
            .find(&week_id)
            .map(|week| week.presentations.clone())
            .unwrap_or_default();
        self.selection = Some(week_id);
    }

    /// Re-derives the presentation list for whatever is selected now.
    pub fn reselect(&mut self) {
        match self.selection.clone() {
            Some(week_id) => self.select(week_id),
            None => self.presentations.clear(),
        }
    }

    pub fn find(&self, week_id: &WeekId) -> Option<&Week> {
        self.weeks.iter().find(|week| &week.week_id == week_id)
    }

    pub fn contains(&self, week_id: &WeekId) -> bool {
        self.find(week_id).is_some()
    }

    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    pub fn selection(&self) -> Option<&WeekId> {
        self.selection.as_ref()
    }

    pub fn presentations(&self) -> &[Presentation] {
        &self.presentations
    }
}
