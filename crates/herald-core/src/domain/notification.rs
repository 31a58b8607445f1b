//! Notification content built from a reminder.

use serde::{Deserialize, Serialize};

use super::ids::ReminderId;
use super::reminder::Reminder;

const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Everything a notifier needs to deliver one reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub reminder_id: ReminderId,
    pub recipient: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
}

impl Notification {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        let description = reminder.description.as_deref().unwrap_or_default();
        let scheduled = reminder.scheduled_at.format(SCHEDULE_FORMAT).to_string();

        let body_text = format!("{description}\n\nScheduled for: {scheduled}");
        let body_html = format!(
            "<h2>{title}</h2>\n\
             <p>{description}</p>\n\
             <p><strong>Scheduled for:</strong> {scheduled}</p>\n\
             <p>This is an automated reminder.</p>",
            title = escape_html(&reminder.title),
            description = escape_html(description),
        );

        Self {
            reminder_id: reminder.id,
            recipient: reminder.recipient_email.clone(),
            subject: format!("Reminder: {}", reminder.title),
            body_text,
            body_html,
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, ReminderDraft};
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn reminder(title: &str, description: Option<&str>) -> Reminder {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        let mut draft = ReminderDraft::new(title, at, "ana@example.com");
        draft.description = description.map(str::to_string);
        Reminder::new(
            ReminderId::from_ulid(Ulid::new()),
            OwnerId::from_ulid(Ulid::new()),
            draft.validate().unwrap(),
            at,
        )
    }

    #[test]
    fn composes_subject_and_bodies() {
        let r = reminder("Dentist", Some("Bring the insurance card"));
        let n = Notification::for_reminder(&r);

        assert_eq!(n.reminder_id, r.id);
        assert_eq!(n.recipient, "ana@example.com");
        assert_eq!(n.subject, "Reminder: Dentist");
        assert_eq!(
            n.body_text,
            "Bring the insurance card\n\nScheduled for: 2025-06-01 08:30 UTC"
        );
        assert!(n.body_html.starts_with("<h2>Dentist</h2>"));
        assert!(n.body_html.contains("<strong>Scheduled for:</strong> 2025-06-01 08:30 UTC"));
    }

    #[test]
    fn missing_description_leaves_empty_paragraph() {
        let n = Notification::for_reminder(&reminder("Call mum", None));
        assert!(n.body_text.starts_with("\n\nScheduled for:"));
        assert!(n.body_html.contains("<p></p>"));
    }

    #[test]
    fn html_body_is_escaped() {
        let n = Notification::for_reminder(&reminder("<b>Tea</b> & cake", Some("\"now\"")));
        assert!(n.body_html.contains("&lt;b&gt;Tea&lt;/b&gt; &amp; cake"));
        assert!(n.body_html.contains("&quot;now&quot;"));
        assert_eq!(n.subject, "Reminder: <b>Tea</b> & cake");
    }
}
