use axum::{extract::State, response::Html, Extension, Form};
use common::actions::{JobRequest, RunOutcome};
use common::errors::{ActionError, SchedulerError, ValidationError};
use common::models::Identity;
use common::shell::split_arguments;
use common::telemetry;
use serde::Deserialize;

use super::portal::{render_portal, FormValues};
use super::{ErrorResponse, Flash};
use crate::state::AppState;

/// The portal form, shared by both actions
#[derive(Debug, Clone, Deserialize)]
pub struct JobForm {
    pub user: String,
    pub script: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub hour: String,
    #[serde(default)]
    pub minute: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub run_title: String,
}

impl From<&JobForm> for FormValues {
    fn from(form: &JobForm) -> Self {
        Self {
            user: Some(form.user.clone()),
            script: Some(form.script.clone()),
            arguments: form.arguments.clone(),
            hour: Some(form.hour.clone()),
            minute: Some(form.minute.clone()),
            title: Some(form.title.clone()),
            run_title: Some(form.run_title.clone()),
        }
    }
}

fn parse_clock_field(field: &str, value: &str) -> Result<u8, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    value
        .parse::<u8>()
        .map_err(|_| ValidationError::InvalidFieldValue {
            field: field.to_string(),
            reason: format!("'{}' is not a whole number", value),
        })
}

/// Resolve the selection and parse the free-text fields
fn job_request(state: &AppState, form: &JobForm, title: &str) -> Result<JobRequest, ActionError> {
    let script_path = state.catalog.resolve(&form.user, &form.script)?;
    let arguments = split_arguments(&form.arguments)?;
    Ok(JobRequest {
        user: form.user.clone(),
        script_path,
        arguments,
        title: title.to_string(),
        hour: parse_clock_field("hour", &form.hour)?,
        minute: parse_clock_field("minute", &form.minute)?,
    })
}

fn rejected_form(action: &'static str, error: &ActionError) {
    let reason = match error {
        ActionError::Catalog(_) => "catalog",
        _ => "validation",
    };
    telemetry::record_action_failure(action, reason);
    tracing::warn!(action = action, error = %error, "Form rejected");
}

/// The single message shown for a failed action
pub fn error_flash(error: &ActionError) -> Flash {
    match error {
        ActionError::Scheduler(SchedulerError::Unreachable(message)) => Flash::error(message.clone()),
        ActionError::Scheduler(e @ SchedulerError::Rejection { .. }) => Flash::error(e.to_string()),
        other => Flash::error(format!("Error: {}", other)),
    }
}

pub fn run_flash(outcome: RunOutcome) -> Flash {
    match outcome {
        RunOutcome::Triggered {
            event_id,
            run_response,
        } => Flash::success(format!("Triggered ✔ (event id: {})", event_id))
            .with_detail(&run_response.into_value()),
        RunOutcome::TriggeredUnconfirmed { .. } => {
            Flash::success("Triggered ✔ (scheduler accepted schedule and is running).")
        }
        RunOutcome::AcceptedWithoutId => Flash::success(
            "Triggered ✔ (scheduler accepted schedule). Check the scheduler UI for the live run.",
        ),
    }
}

/// Create a daily event for the selected script
#[tracing::instrument(skip(state, identity, form), fields(user = %form.user, script = %form.script))]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<JobForm>,
) -> Result<Html<String>, ErrorResponse> {
    let flash = match job_request(&state, &form, &form.title) {
        Ok(request) => match state.jobs.create_job(&request).await {
            Ok(outcome) => Flash::success(format!(
                "Created ✔ (id: {}) – {}",
                outcome.event_id.as_deref().unwrap_or("unknown"),
                outcome.schedule
            )),
            Err(e) => error_flash(&e),
        },
        Err(e) => {
            rejected_form("create_job", &e);
            error_flash(&e)
        }
    };

    render_portal(&state, &identity, &FormValues::from(&form), Some(flash))
}

/// Create an event for the selected script and ask the scheduler to run it now
#[tracing::instrument(skip(state, identity, form), fields(user = %form.user, script = %form.script))]
pub async fn run_now(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<JobForm>,
) -> Result<Html<String>, ErrorResponse> {
    let flash = match job_request(&state, &form, &form.run_title) {
        Ok(request) => match state.jobs.run_now(&request).await {
            Ok(outcome) => run_flash(outcome),
            Err(e) => error_flash(&e),
        },
        Err(e) => {
            rejected_form("run_now", &e);
            error_flash(&e)
        }
    };

    render_portal(&state, &identity, &FormValues::from(&form), Some(flash))
}
