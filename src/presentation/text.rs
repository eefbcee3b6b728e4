//! Plain-text rendering of the same view models for the terminal.

use std::fmt::Write;

use crate::application::admin::{AdminViewModel, DashboardBody};
use crate::application::list::{EMPTY_MESSAGE, ListStatus, ListViewModel};
use crate::application::overlay::OverlayView;
use crate::domain::posts::derive_excerpt;

use super::views::LOADING_MESSAGE;

const CONTENT_PREVIEW_CHARS: usize = 2_000;

pub fn post_list(model: &ListViewModel) -> String {
    let mut out = String::new();
    match &model.status {
        ListStatus::Loading => out.push_str(LOADING_MESSAGE),
        ListStatus::Empty => out.push_str(EMPTY_MESSAGE),
        ListStatus::Failed { message } => {
            out.push_str(message);
            if let Some(detail) = &model.failure_detail {
                let _ = write!(out, "\n  {detail}");
            }
        }
        ListStatus::Ready => {
            let mut shown = 0;
            for card in model.visible_cards() {
                shown += 1;
                let tags = card
                    .tags
                    .iter()
                    .map(|tag| {
                        if tag.active {
                            format!("[#{}]", tag.label)
                        } else {
                            format!("#{}", tag.label)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(out, "[{}] {}  ({})", card.id, card.title, card.date);
                if !tags.is_empty() {
                    let _ = writeln!(out, "    {tags}");
                }
                let _ = writeln!(out, "    {}", card.excerpt);
            }
            if shown == 0 {
                out.push_str(EMPTY_MESSAGE);
            }
        }
    }
    out.trim_end().to_string()
}

pub fn overlay(view: &OverlayView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", view.date);
    if !view.tags.is_empty() {
        let tags = view
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "{tags}");
    }
    if let Some(image) = &view.image {
        let _ = writeln!(out, "cover: {image}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", derive_excerpt(&view.content, CONTENT_PREVIEW_CHARS));
    let _ = writeln!(out);
    out.push_str(&claps_line(view));
    out
}

/// `N Claps`, marked while the count is still the list snapshot.
pub fn claps_line(view: &OverlayView) -> String {
    if view.is_confirmed() {
        view.claps_label()
    } else {
        format!("{} (syncing)", view.claps_label())
    }
}

pub fn admin(model: &AdminViewModel) -> String {
    let mut out = String::new();
    match model {
        AdminViewModel::Login(form) => {
            out.push_str("Please login to continue");
            if let Some(error) = &form.error {
                let _ = write!(out, "\n{error}");
            }
        }
        AdminViewModel::Dashboard {
            email,
            notice,
            body,
        } => {
            if let Some(email) = email {
                let _ = writeln!(out, "Signed in as {email}");
            }
            if let Some(notice) = notice {
                let _ = writeln!(out, "{notice}");
            }
            match body {
                DashboardBody::Loading => out.push_str(LOADING_MESSAGE),
                DashboardBody::Failed(message) => out.push_str(message),
                DashboardBody::Empty(message) => out.push_str(message),
                DashboardBody::Rows(rows) => {
                    for row in rows {
                        let tags = row
                            .tags
                            .iter()
                            .map(|tag| format!("#{tag}"))
                            .collect::<Vec<_>>()
                            .join(" ");
                        let _ = writeln!(
                            out,
                            "[{}] {} | {} | {} Claps | {}",
                            row.id, row.title, row.date, row.claps, tags
                        );
                    }
                }
                DashboardBody::Editor(form) => {
                    let _ = writeln!(out, "{}", form.heading());
                    if let Some(error) = &form.error {
                        let _ = writeln!(out, "{error}");
                    }
                }
            }
        }
    }
    out.trim_end().to_string()
}
