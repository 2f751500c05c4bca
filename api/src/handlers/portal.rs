use axum::{
    extract::{Query, State},
    response::Html,
    Extension,
};
use common::models::Identity;
use serde::Deserialize;
use std::path::Path;
use tera::Context;

use super::{render, ErrorResponse, Flash};
use crate::state::AppState;

const DEFAULT_HOUR: &str = "9";
const DEFAULT_MINUTE: &str = "0";

/// Picker selection carried in the query string
#[derive(Debug, Default, Deserialize)]
pub struct PortalQuery {
    pub user: Option<String>,
    pub script: Option<String>,
}

/// Values echoed back into the form
#[derive(Debug, Default, Clone)]
pub struct FormValues {
    pub user: Option<String>,
    pub script: Option<String>,
    pub arguments: String,
    pub hour: Option<String>,
    pub minute: Option<String>,
    pub title: Option<String>,
    pub run_title: Option<String>,
}

impl From<PortalQuery> for FormValues {
    fn from(query: PortalQuery) -> Self {
        Self {
            user: query.user,
            script: query.script,
            ..Default::default()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Pick `wanted` when it is one of `options`, else the first option
fn choose(options: &[String], wanted: Option<&str>) -> Option<String> {
    wanted
        .and_then(|w| options.iter().find(|o| o.as_str() == w))
        .or_else(|| options.first())
        .cloned()
}

/// Main page: pickers, arguments, schedule and the two actions
#[tracing::instrument(skip(state, identity))]
pub async fn portal_page(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PortalQuery>,
) -> Result<Html<String>, ErrorResponse> {
    render_portal(&state, &identity, &query.into(), None)
}

pub fn render_portal(
    state: &AppState,
    identity: &Identity,
    values: &FormValues,
    flash: Option<Flash>,
) -> Result<Html<String>, ErrorResponse> {
    let config = &state.config;
    let mut context = Context::new();
    context.insert("display_name", &identity.display_name());
    context.insert("scheduler_url", &config.scheduler.url);
    context.insert("target_host", &config.scheduler.target_host);
    context.insert("scripts_dir", &config.scripts.scripts_dir);
    context.insert("outputs_dir", &config.scripts.outputs_dir);
    context.insert("extension", state.catalog.extension());
    context.insert("flash", &flash);

    let (users, catalog_error) = match state.catalog.user_folders() {
        Ok(users) => (users, None),
        Err(e) => {
            tracing::error!(error = %e, "Script catalog unavailable");
            (Vec::new(), Some(e.to_string()))
        }
    };
    context.insert("catalog_error", &catalog_error);

    let selected_user = choose(&users, values.user.as_deref()).unwrap_or_default();
    let scripts = if selected_user.is_empty() {
        Vec::new()
    } else {
        state.catalog.scripts_for(&selected_user).unwrap_or_else(|e| {
            tracing::warn!(user = %selected_user, error = %e, "Failed to list scripts");
            Vec::new()
        })
    };
    let selected_script = choose(&scripts, values.script.as_deref()).unwrap_or_default();
    let file_name = Path::new(&selected_script)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let title = non_blank(&values.title)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}: {}", selected_user, file_name));
    let run_title = non_blank(&values.run_title)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Run now: {}/{}", selected_user, file_name));

    context.insert("users", &users);
    context.insert("selected_user", &selected_user);
    context.insert(
        "user_dir",
        &state.catalog.base_dir().join(&selected_user).display().to_string(),
    );
    context.insert("scripts", &scripts);
    context.insert("selected_script", &selected_script);
    context.insert("arguments", &values.arguments);
    context.insert("hour", non_blank(&values.hour).unwrap_or(DEFAULT_HOUR));
    context.insert("minute", non_blank(&values.minute).unwrap_or(DEFAULT_MINUTE));
    context.insert("title", &title);
    context.insert("run_title", &run_title);

    render("portal.html", &context)
}
