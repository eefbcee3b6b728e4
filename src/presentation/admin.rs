//! HTML views for the admin screens.

use askama::Template;

use crate::application::admin::{AdminViewModel, DashboardBody, EditorForm, LoginForm};

use super::views::{LOADING_MESSAGE, TemplateRenderError, render_template};

#[derive(Clone)]
pub struct LoginView {
    pub email: String,
    pub submit_label: &'static str,
    pub is_busy: bool,
    pub error: Option<String>,
}

impl LoginView {
    fn from_form(form: &LoginForm) -> Self {
        Self {
            email: form.email.clone(),
            submit_label: form.submit_label(),
            is_busy: form.busy,
            error: form.error.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminPostRowView {
    pub id: String,
    pub title: String,
    pub date: String,
    pub claps: u64,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct EditorView {
    pub heading: &'static str,
    pub post_id: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: String,
    pub image: String,
    pub submit_label: &'static str,
    pub is_busy: bool,
    pub error: Option<String>,
}

impl EditorView {
    fn from_form(form: &EditorForm) -> Self {
        Self {
            heading: form.heading(),
            post_id: form.editing().map(|id| id.to_string()),
            title: form.title.clone(),
            content: form.content.clone(),
            tags: form.tags.clone(),
            image: form.image.clone(),
            submit_label: form.submit_label(),
            is_busy: form.busy,
            error: form.error.clone(),
        }
    }
}

/// Dashboard body; at most one of the optional parts is set.
#[derive(Clone)]
pub struct DashboardView {
    pub email: Option<String>,
    pub notice: Option<String>,
    pub status: Option<String>,
    pub is_error: bool,
    pub rows: Vec<AdminPostRowView>,
    pub editor: Option<EditorView>,
}

impl DashboardView {
    fn new(email: Option<String>, notice: Option<String>, body: &DashboardBody) -> Self {
        let mut view = Self {
            email,
            notice,
            status: None,
            is_error: false,
            rows: Vec::new(),
            editor: None,
        };
        match body {
            DashboardBody::Loading => view.status = Some(LOADING_MESSAGE.to_string()),
            DashboardBody::Failed(message) => {
                view.status = Some(message.clone());
                view.is_error = true;
            }
            DashboardBody::Empty(message) => view.status = Some((*message).to_string()),
            DashboardBody::Rows(rows) => {
                view.rows = rows
                    .iter()
                    .map(|row| AdminPostRowView {
                        id: row.id.to_string(),
                        title: row.title.clone(),
                        date: row.date.clone(),
                        claps: row.claps,
                        tags: row.tags.clone(),
                    })
                    .collect();
            }
            DashboardBody::Editor(form) => view.editor = Some(EditorView::from_form(form)),
        }
        view
    }
}

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub content: LoginView,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub content: DashboardView,
}

pub fn render_admin(model: &AdminViewModel) -> Result<String, TemplateRenderError> {
    match model {
        AdminViewModel::Login(form) => render_template(AdminLoginTemplate {
            content: LoginView::from_form(form),
        }),
        AdminViewModel::Dashboard {
            email,
            notice,
            body,
        } => render_template(AdminDashboardTemplate {
            content: DashboardView::new(email.clone(), notice.clone(), body),
        }),
    }
}
