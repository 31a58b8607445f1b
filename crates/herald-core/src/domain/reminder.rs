//! Reminder record and the user-supplied draft it is built from.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{HeraldError, Result};
use super::ids::{OwnerId, ReminderId};
use super::status::ReminderStatus;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+@.+\..+$").expect("email pattern compiles"));

/// Does `value` look like an email address?
pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// Repeat cadence. Stored as metadata only; the engine never expands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCadence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatCadence {
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatCadence::None => "none",
            RepeatCadence::Daily => "daily",
            RepeatCadence::Weekly => "weekly",
            RepeatCadence::Monthly => "monthly",
            RepeatCadence::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RepeatCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatCadence {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(RepeatCadence::None),
            "daily" => Ok(RepeatCadence::Daily),
            "weekly" => Ok(RepeatCadence::Weekly),
            "monthly" => Ok(RepeatCadence::Monthly),
            "yearly" => Ok(RepeatCadence::Yearly),
            other => Err(HeraldError::validation(
                "repeat",
                format!("unknown cadence '{other}'"),
            )),
        }
    }
}

/// Fields a user submits when creating or editing a reminder.
///
/// Raw input; call [`ReminderDraft::validate`] before handing it to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub recipient_email: String,
    #[serde(default)]
    pub repeat: RepeatCadence,
}

impl ReminderDraft {
    pub fn new(
        title: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        recipient_email: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            scheduled_at,
            recipient_email: recipient_email.into(),
            repeat: RepeatCadence::None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatCadence) -> Self {
        self.repeat = repeat;
        self
    }

    /// Normalise and check every field.
    ///
    /// Trims text, lower-cases the address, drops an empty description and
    /// truncates the schedule to millisecond precision.
    pub fn validate(self) -> Result<ReminderFields> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(HeraldError::validation("title", "title is required"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(HeraldError::validation(
                "title",
                format!("must be at most {TITLE_MAX_CHARS} characters"),
            ));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = &description
            && d.chars().count() > DESCRIPTION_MAX_CHARS
        {
            return Err(HeraldError::validation(
                "description",
                format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
            ));
        }

        let recipient_email = self.recipient_email.trim().to_lowercase();
        if !is_email_shaped(&recipient_email) {
            return Err(HeraldError::validation(
                "recipient_email",
                "please enter a valid email",
            ));
        }

        Ok(ReminderFields {
            title,
            description,
            scheduled_at: self.scheduled_at.trunc_subsecs(3),
            recipient_email,
            repeat: self.repeat,
        })
    }
}

/// Validated, user-editable fields of a reminder.
///
/// Only [`ReminderDraft::validate`] produces this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderFields {
    title: String,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    recipient_email: String,
    repeat: RepeatCadence,
}

impl ReminderFields {
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub recipient_email: String,
    pub repeat: RepeatCadence,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every mutation. A writer holding an older snapshot can
    /// detect that the record moved on even when the status did not.
    #[serde(default)]
    pub revision: u64,
}

impl Reminder {
    /// A freshly created reminder starts `Upcoming`.
    pub fn new(id: ReminderId, owner_id: OwnerId, fields: ReminderFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            title: fields.title,
            description: fields.description,
            scheduled_at: fields.scheduled_at,
            recipient_email: fields.recipient_email,
            repeat: fields.repeat,
            status: ReminderStatus::Upcoming,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Replace the editable fields. Status and identity are untouched.
    pub fn apply_fields(&mut self, fields: ReminderFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.description = fields.description;
        self.scheduled_at = fields.scheduled_at;
        self.recipient_email = fields.recipient_email;
        self.repeat = fields.repeat;
        self.touch(now);
    }

    pub fn set_status(&mut self, status: ReminderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.revision += 1;
    }

    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.owner_id == owner
    }

    /// Case-insensitive substring match over title and description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}
