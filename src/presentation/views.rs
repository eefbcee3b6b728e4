use askama::{Error as AskamaError, Template};
use thiserror::Error;
use tracing::error;

use crate::application::error::{AppError, ErrorReport};
use crate::application::list::{EMPTY_MESSAGE, ListStatus, ListViewModel};
use crate::application::overlay::{Burst, OverlayView};

pub const LOADING_MESSAGE: &str = "Loading posts...";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for AppError {
    fn from(err: TemplateRenderError) -> Self {
        let report = ErrorReport::from_error(err.source, &err.error);
        error!(source = report.source, detail = %report.joined(), "template rendering failed");
        AppError::unexpected(err.public_message)
    }
}

pub fn render_template<T: Template>(template: T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

#[derive(Clone)]
pub struct TagChip {
    pub label: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub tags: Vec<TagChip>,
    pub tag_list: String,
    pub is_hidden: bool,
    pub entrance_delay_ms: Option<u128>,
}

/// Grid body: exactly one of the status message or the cards is shown.
#[derive(Clone)]
pub struct PostGridView {
    pub message: Option<String>,
    pub detail: Option<String>,
    pub is_error: bool,
    pub active_tag: Option<String>,
    pub cards: Vec<PostCard>,
}

impl PostGridView {
    pub fn from_model(model: &ListViewModel) -> Self {
        let (message, is_error) = match &model.status {
            ListStatus::Loading => (Some(LOADING_MESSAGE.to_string()), false),
            ListStatus::Ready => (None, false),
            ListStatus::Failed { message } => (Some(message.clone()), true),
            ListStatus::Empty => (Some(EMPTY_MESSAGE.to_string()), false),
        };

        let cards = model
            .cards
            .iter()
            .map(|card| PostCard {
                id: card.id.to_string(),
                title: card.title.clone(),
                excerpt: card.excerpt.clone(),
                date: card.date.clone(),
                tag_list: card
                    .tags
                    .iter()
                    .map(|tag| tag.label.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                tags: card
                    .tags
                    .iter()
                    .map(|tag| TagChip {
                        label: tag.label.clone(),
                        is_active: tag.active,
                    })
                    .collect(),
                is_hidden: !card.visible,
                entrance_delay_ms: card.entrance_delay.map(|delay| delay.as_millis()),
            })
            .collect();

        Self {
            message,
            detail: model.failure_detail.clone(),
            is_error,
            active_tag: model.active_tag.clone(),
            cards,
        }
    }
}

#[derive(Template)]
#[template(path = "post_grid.html")]
pub struct PostGridTemplate {
    pub content: PostGridView,
}

#[derive(Clone)]
pub struct ParticleView {
    pub color: String,
    pub size_px: u32,
    pub dx: i32,
    pub dy: i32,
}

#[derive(Clone)]
pub struct OverlayPanelView {
    pub post_id: String,
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    pub content: String,
    pub image: Option<String>,
    pub claps_label: String,
    pub is_confirmed: bool,
    pub burst_ms: u128,
    pub particles: Vec<ParticleView>,
}

impl OverlayPanelView {
    pub fn from_view(view: &OverlayView, burst: Option<&Burst>) -> Self {
        let (burst_ms, particles) = match burst {
            Some(burst) => (
                burst.duration.as_millis(),
                burst
                    .particles
                    .iter()
                    .map(|particle| ParticleView {
                        color: particle.color.to_string(),
                        size_px: particle.size_px.round() as u32,
                        dx: particle.dx.round() as i32,
                        dy: particle.dy.round() as i32,
                    })
                    .collect(),
            ),
            None => (0, Vec::new()),
        };

        Self {
            post_id: view.post_id.to_string(),
            title: view.title.clone(),
            date: view.date.clone(),
            tags: view.tags.clone(),
            content: view.content.clone(),
            image: view.image.clone(),
            claps_label: view.claps_label(),
            is_confirmed: view.is_confirmed(),
            burst_ms,
            particles,
        }
    }
}

#[derive(Template)]
#[template(path = "overlay.html")]
pub struct OverlayTemplate {
    pub content: OverlayPanelView,
}

pub fn render_post_grid(model: &ListViewModel) -> Result<String, TemplateRenderError> {
    render_template(PostGridTemplate {
        content: PostGridView::from_model(model),
    })
}

pub fn render_overlay(
    view: &OverlayView,
    burst: Option<&Burst>,
) -> Result<String, TemplateRenderError> {
    render_template(OverlayTemplate {
        content: OverlayPanelView::from_view(view, burst),
    })
}
