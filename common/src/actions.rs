// User actions: schedule a daily job or trigger a one-off run
//
// Each action runs its scheduler calls strictly in sequence:
// health check, then create, then (run-now only) run.

use crate::command::CommandBuilder;
use crate::errors::{ActionError, SchedulerError, ValidationError};
use crate::models::{EventResponse, ScheduleTiming};
use crate::normalizer::extract_event_id;
use crate::scheduler::SchedulerApi;
use crate::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What the user picked on the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// User folder name
    pub user: String,
    /// Resolved absolute path of the script
    pub script_path: PathBuf,
    pub arguments: Vec<String>,
    /// Blank means "use the default title"
    pub title: String,
    pub hour: u8,
    pub minute: u8,
}

impl JobRequest {
    fn file_name(&self) -> String {
        self.script_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.script_path.display().to_string())
    }

    /// `<user>: <file>`
    pub fn default_job_title(&self) -> String {
        format!("{}: {}", self.user, self.file_name())
    }

    /// `Run now: <user>/<file>`
    pub fn default_run_title(&self) -> String {
        format!("Run now: {}/{}", self.user, self.file_name())
    }

    fn title_or(&self, fallback: String) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            fallback
        } else {
            title.to_string()
        }
    }

    fn timing(&self) -> Result<ScheduleTiming, ValidationError> {
        ScheduleTiming::daily(self.hour, self.minute)
    }
}

/// Result of scheduling a daily job
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// `None` when the scheduler accepted the event but its id was not found
    pub event_id: Option<String>,
    pub title: String,
    pub schedule: String,
}

/// Result of a one-off run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Event created and the run request was accepted
    Triggered {
        event_id: String,
        run_response: EventResponse,
    },
    /// Event created; the follow-up run request failed, the schedule stands
    TriggeredUnconfirmed { event_id: String, reason: String },
    /// Event created but no identifier could be found, so no run was requested
    AcceptedWithoutId,
}

/// Orchestrates a single user action against the scheduler
pub struct JobService {
    scheduler: Arc<dyn SchedulerApi>,
    commands: CommandBuilder,
}

impl JobService {
    pub fn new(scheduler: Arc<dyn SchedulerApi>, commands: CommandBuilder) -> Self {
        Self {
            scheduler,
            commands,
        }
    }

    pub fn scheduler(&self) -> &Arc<dyn SchedulerApi> {
        &self.scheduler
    }

    /// Preview of the command an action would submit
    pub fn command_for(&self, request: &JobRequest) -> String {
        self.commands
            .build(&request.script_path, &request.arguments)
    }

    async fn ensure_reachable(&self) -> Result<(), SchedulerError> {
        let health = self.scheduler.health_check().await;
        if health.reachable {
            Ok(())
        } else {
            Err(SchedulerError::Unreachable(health.message))
        }
    }

    /// Create the event and insist on an application-level success code
    async fn create(
        &self,
        title: &str,
        request: &JobRequest,
    ) -> Result<EventResponse, ActionError> {
        let timing = request.timing()?;
        self.ensure_reachable().await?;

        let command = self.command_for(request);
        let response = self
            .scheduler
            .create_event(title, &command, timing)
            .await?;

        if !response.is_success() {
            return Err(SchedulerError::Rejection {
                payload: response.into_value(),
            }
            .into());
        }
        Ok(response)
    }

    /// Schedule `request` to run every day at its hour and minute
    #[instrument(skip(self), fields(user = %request.user))]
    pub async fn create_job(&self, request: &JobRequest) -> Result<CreateOutcome, ActionError> {
        let title = request.title_or(request.default_job_title());
        let result = self.create(&title, request).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_failure("create_job", &e);
                return Err(e);
            }
        };

        let event_id = extract_event_id(&response);
        let schedule = request.timing()?.describe();
        telemetry::record_event_created("create_job");
        info!(event_id = ?event_id, title = %title, schedule = %schedule, "Job scheduled");

        Ok(CreateOutcome {
            event_id,
            title,
            schedule,
        })
    }

    /// Run `request` once, now.
    ///
    /// The scheduler is given a regular daily event (older builds refuse
    /// one-shot timings), followed by an explicit run request when the new
    /// event's identifier is known. The daily schedule therefore remains in
    /// place after the immediate run.
    #[instrument(skip(self), fields(user = %request.user))]
    pub async fn run_now(&self, request: &JobRequest) -> Result<RunOutcome, ActionError> {
        let title = request.title_or(request.default_run_title());
        let response = match self.create(&title, request).await {
            Ok(response) => response,
            Err(e) => {
                record_failure("run_now", &e);
                return Err(e);
            }
        };
        telemetry::record_event_created("run_now");

        let Some(event_id) = extract_event_id(&response) else {
            info!(title = %title, "Event accepted without identifier; run request skipped");
            return Ok(RunOutcome::AcceptedWithoutId);
        };

        match self.scheduler.run_event(&event_id).await {
            Ok(run_response) => {
                telemetry::record_event_run();
                info!(event_id = %event_id, "Run requested");
                Ok(RunOutcome::Triggered {
                    event_id,
                    run_response,
                })
            }
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "Run request failed; event remains scheduled");
                Ok(RunOutcome::TriggeredUnconfirmed {
                    event_id,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn record_failure(action: &'static str, error: &ActionError) {
    let reason = match error {
        ActionError::Scheduler(e) => e.kind(),
        ActionError::Validation(_) => "validation",
        ActionError::Catalog(_) => "catalog",
    };
    telemetry::record_action_failure(action, reason);
    warn!(action = action, reason = reason, error = %error, "Action failed");
}
