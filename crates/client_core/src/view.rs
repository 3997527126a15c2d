//! Read-only projection of client state for display.

use std::fmt::Write as _;

use shared::domain::{Presentation, PresentationId, WeekId};

use crate::{
    status::StatusMessage,
    store::WeekStore,
    week_id::{iso_week_id, parse_date_input},
};

pub const NO_PRESENTATIONS: &str = "No presentations yet.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateButton {
    pub label: &'static str,
    pub enabled: bool,
    /// Identifier the button would create or open.
    pub target: Option<WeekId>,
}

/// Label is "Go to Week" when the picked date's week is already cached.
pub fn create_button(store: &WeekStore, date_input: &str) -> CreateButton {
    match parse_date_input(date_input) {
        Ok(date) => {
            let target = iso_week_id(date);
            let label = if store.contains(&target) {
                "Go to Week"
            } else {
                "Create Week"
            };
            CreateButton {
                label,
                enabled: true,
                target: Some(target),
            }
        }
        Err(_) => CreateButton {
            label: "Create Week",
            enabled: false,
            target: None,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekButton {
    pub week_id: WeekId,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationCard {
    pub id: PresentationId,
    pub title: String,
    pub presenter: String,
    pub votes: u32,
    pub rating: Option<(f64, u32)>,
    pub comments: Option<u32>,
}

impl From<&Presentation> for PresentationCard {
    fn from(p: &Presentation) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            presenter: p.presenter.clone(),
            votes: p.votes,
            rating: p
                .average_rating
                .zip(p.rating_count)
                .filter(|(_, count)| *count > 0),
            comments: p.comment_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub identity: Option<String>,
    pub message: Option<StatusMessage>,
    pub create_button: CreateButton,
    pub selected_week: Option<WeekId>,
    pub weeks: Vec<WeekButton>,
    pub cards: Vec<PresentationCard>,
}

impl PageView {
    pub fn build(
        store: &WeekStore,
        identity: Option<String>,
        message: Option<StatusMessage>,
        date_input: &str,
    ) -> Self {
        let selected = store.selection().cloned();
        Self {
            identity,
            message,
            create_button: create_button(store, date_input),
            weeks: store
                .weeks()
                .iter()
                .map(|week| WeekButton {
                    week_id: week.week_id.clone(),
                    selected: selected.as_ref() == Some(&week.week_id),
                })
                .collect(),
            cards: store.presentations().iter().map(PresentationCard::from).collect(),
            selected_week: selected,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Lab Presentation Voting");
        if let Some(identity) = &self.identity {
            let _ = writeln!(out, "Signed in as {identity}");
        }
        if let Some(message) = &self.message {
            let _ = writeln!(out, "[{}] {}", message.kind, message.text);
        }

        let button = &self.create_button;
        let state = if button.enabled { "" } else { " (disabled)" };
        match &button.target {
            Some(target) => {
                let _ = writeln!(out, "[{}{state}] {target}", button.label);
            }
            None => {
                let _ = writeln!(out, "[{}{state}]", button.label);
            }
        }
        let selected = self
            .selected_week
            .as_ref()
            .map(WeekId::as_str)
            .unwrap_or("-");
        let _ = writeln!(out, "Selected Week: {selected}");

        let _ = writeln!(out, "\nWeeks");
        for week in &self.weeks {
            let marker = if week.selected { '*' } else { ' ' };
            let _ = writeln!(out, " {marker} {}", week.week_id);
        }

        let _ = writeln!(out, "\nPresentations");
        if self.cards.is_empty() {
            let _ = writeln!(out, "  {NO_PRESENTATIONS}");
        }
        for card in &self.cards {
            let _ = write!(
                out,
                "  #{} {} (Presenter: {}) votes: {}",
                card.id, card.title, card.presenter, card.votes
            );
            if let Some((average, count)) = card.rating {
                let _ = write!(out, " rating: {average:.1} ({count})");
            }
            if let Some(comments) = card.comments {
                let _ = write!(out, " comments: {comments}");
            }
            out.push('\n');
        }
        out
    }
}
