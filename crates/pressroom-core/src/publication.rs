//! Publication state machine.
//!
//! Computes the next `(status, published_at, scheduled_at)` triple for a post
//! from an authoring intent. Pure: `now` is always passed in.
//!
//! Rules, first match wins:
//!
//! 1. `SaveAsDraft` clears both timestamps.
//! 2. `PublishNow` publishes, keeping an existing `published_at`.
//! 3. `ScheduleFor(t)` with `t <= now` publishes with `published_at = t`
//!    unless the post was already published.
//! 4. `ScheduleFor(t)` with `t > now` reverts to draft with `scheduled_at = t`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PostStatus, PublicationState};
use crate::error::PublicationError;

/// Form-field timestamp format used by the admin editor.
const FORM_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A requested schedule time, possibly still raw user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTime {
    At(DateTime<Utc>),
    Raw(String),
}

impl ScheduleTime {
    /// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) timestamp.
    pub fn parse(input: &str) -> Result<DateTime<Utc>, PublicationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "empty timestamp"));
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(at.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(trimmed, FORM_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| invalid(input, &e.to_string()))
    }

    /// The concrete instant, parsing raw input if needed.
    pub fn resolve(&self) -> Result<DateTime<Utc>, PublicationError> {
        match self {
            ScheduleTime::At(at) => Ok(*at),
            ScheduleTime::Raw(input) => Self::parse(input),
        }
    }
}

fn invalid(input: &str, reason: &str) -> PublicationError {
    PublicationError::InvalidScheduleTime {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// What an author asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SaveAsDraft,
    PublishNow,
    ScheduleFor(ScheduleTime),
}

impl Intent {
    pub fn schedule_at(at: DateTime<Utc>) -> Self {
        Intent::ScheduleFor(ScheduleTime::At(at))
    }

    /// Schedule from raw input; validated when the transition runs.
    pub fn schedule_from_str(input: impl Into<String>) -> Self {
        Intent::ScheduleFor(ScheduleTime::Raw(input.into()))
    }

    /// Map the editor's `status` and `scheduled_at` fields to an intent.
    ///
    /// An explicit publish wins over a schedule; a draft with a non-blank
    /// schedule becomes `ScheduleFor`.
    pub fn from_form(status: PostStatus, scheduled_at: Option<&str>) -> Self {
        match (status, scheduled_at.map(str::trim)) {
            (PostStatus::Published, _) => Intent::PublishNow,
            (PostStatus::Draft, Some(raw)) if !raw.is_empty() => Intent::schedule_from_str(raw),
            (PostStatus::Draft, _) => Intent::SaveAsDraft,
        }
    }
}

/// Compute the next publication state.
pub fn transition(
    current: &PublicationState,
    intent: &Intent,
    now: DateTime<Utc>,
) -> Result<PublicationState, PublicationError> {
    match intent {
        Intent::SaveAsDraft => Ok(PublicationState::new_post()),
        Intent::PublishNow => Ok(publish(current, now)),
        Intent::ScheduleFor(time) => {
            let at = time.resolve()?;
            if at <= now {
                Ok(publish(current, at))
            } else {
                Ok(PublicationState {
                    status: PostStatus::Draft,
                    published_at: None,
                    scheduled_at: Some(at),
                })
            }
        }
    }
}

/// The state a due draft moves to when the runner fires.
///
/// `published_at` becomes the promised `scheduled_at`, not `now`.
/// Returns `None` if the post is not due.
pub fn publish_due(current: &PublicationState, now: DateTime<Utc>) -> Option<PublicationState> {
    if !current.is_due(now) {
        return None;
    }
    let at = current.scheduled_at?;
    Some(publish(current, at))
}

fn publish(current: &PublicationState, at: DateTime<Utc>) -> PublicationState {
    let published_at = match (current.status, current.published_at) {
        (PostStatus::Published, Some(original)) => original,
        _ => at,
    };

    PublicationState {
        status: PostStatus::Published,
        published_at: Some(published_at),
        scheduled_at: None,
    }
}
