//! Reminder persistence. Status transitions out of `pending` are
//! compare-and-set so a delivery racing a cancel settles exactly one way.

use ashbot_core::reminder::{AutoAction, DeliveryKind, Reminder, ReminderStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::info;

use crate::error::{DbError, Result};
use crate::recommendations::parse_ts;
use crate::Database;

/// Fields for a new reminder; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: u64,
    pub text: String,
    pub scheduled_at: DateTime<Utc>,
    pub delivery: DeliveryKind,
    pub channel_id: Option<u64>,
    pub auto_action: Option<AutoAction>,
}

impl Database {
    pub fn add_reminder(&self, new: &NewReminder) -> Result<i64> {
        let auto = new
            .auto_action
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reminders
             (user_id, text, scheduled_at, delivery_kind, channel_id, status, auto_action)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                new.user_id.to_string(),
                new.text,
                new.scheduled_at.to_rfc3339(),
                new.delivery.to_string(),
                new.channel_id.map(|c| c.to_string()),
                auto,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, user_id = new.user_id, scheduled_at = %new.scheduled_at, "reminder created");
        Ok(id)
    }

    pub fn reminder_by_id(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_REMINDER),
            params![id],
            row_to_reminder,
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    /// Pending reminders whose scheduled instant has arrived, ordered by
    /// scheduled time then id (same-instant reminders deliver in id order).
    pub fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = 'pending' AND scheduled_at <= ?1
             ORDER BY scheduled_at, id",
            SELECT_REMINDER
        ))?;
        let rows = stmt
            .query_map(params![now.to_rfc3339()], row_to_reminder)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Pending reminders, optionally narrowed to one user.
    pub fn pending_reminders(&self, user_id: Option<u64>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let rows = match user_id {
            Some(uid) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = 'pending' AND user_id = ?1 ORDER BY scheduled_at, id",
                    SELECT_REMINDER
                ))?;
                let rows = stmt
                    .query_map(params![uid.to_string()], row_to_reminder)?
                    .filter_map(|r| r.ok())
                    .collect();
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = 'pending' ORDER BY scheduled_at, id",
                    SELECT_REMINDER
                ))?;
                let rows = stmt
                    .query_map([], row_to_reminder)?
                    .filter_map(|r| r.ok())
                    .collect();
                rows
            }
        };
        Ok(rows)
    }

    /// pending → delivered. Returns false when the reminder was already
    /// resolved (delivered, cancelled, or failed).
    pub fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reminders SET status = 'delivered', delivered_at = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, now.to_rfc3339()],
        )?;
        Ok(n == 1)
    }

    /// pending → failed, recording the delivery error.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reminders SET status = 'failed', last_error = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, error],
        )?;
        Ok(n == 1)
    }

    /// pending → cancelled.
    pub fn cancel_reminder(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reminders SET status = 'cancelled', cancelled_at = ?2
             WHERE id = ?1 AND status = 'pending'",
            params![id, now.to_rfc3339()],
        )?;
        if n == 1 {
            info!(id, "reminder cancelled");
        }
        Ok(n == 1)
    }
}

const SELECT_REMINDER: &str = "SELECT id, user_id, text, scheduled_at, delivery_kind, channel_id,
        status, auto_action, delivered_at, cancelled_at
 FROM reminders";

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let user_id: String = row.get(1)?;
    let scheduled: String = row.get(3)?;
    let kind: String = row.get(4)?;
    let channel: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;
    let auto: Option<String> = row.get(7)?;
    let delivered: Option<String> = row.get(8)?;
    let cancelled: Option<String> = row.get(9)?;

    Ok(Reminder {
        id: row.get(0)?,
        user_id: user_id.parse().unwrap_or_default(),
        text: row.get(2)?,
        scheduled_at: parse_ts(&scheduled),
        delivery: kind.parse().unwrap_or(DeliveryKind::DirectMessage),
        channel_id: channel.and_then(|c| c.parse().ok()),
        status: status.parse().unwrap_or(ReminderStatus::Pending),
        auto_action: auto.and_then(|a| serde_json::from_str(&a).ok()),
        delivered_at: delivered.map(|t| parse_ts(&t)),
        cancelled_at: cancelled.map(|t| parse_ts(&t)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    fn reminder_at(db: &Database, at: DateTime<Utc>) -> i64 {
        db.add_reminder(&NewReminder {
            user_id: 42,
            text: "Stand up".to_string(),
            scheduled_at: at,
            delivery: DeliveryKind::Channel,
            channel_id: Some(7),
            auto_action: None,
        })
        .unwrap()
    }

    #[test]
    fn due_ordering_same_instant_by_id() {
        let db = Database::open_in_memory(0).unwrap();
        let at = now() - Duration::seconds(5);
        let first = reminder_at(&db, at);
        let second = reminder_at(&db, at);
        reminder_at(&db, now() + Duration::minutes(5));

        let due = db.due_reminders(now()).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, first);
        assert_eq!(due[1].id, second);
    }

    #[test]
    fn delivery_is_compare_and_set() {
        let db = Database::open_in_memory(0).unwrap();
        let id = reminder_at(&db, now());

        assert!(db.mark_delivered(id, now()).unwrap());
        // A second transition attempt of any kind is a no-op.
        assert!(!db.mark_delivered(id, now()).unwrap());
        assert!(!db.cancel_reminder(id, now()).unwrap());
        assert!(!db.mark_failed(id, "late failure").unwrap());

        let r = db.reminder_by_id(id).unwrap().unwrap();
        assert_eq!(r.status, ReminderStatus::Delivered);
        assert!(r.delivered_at.is_some());
        assert!(r.cancelled_at.is_none());
    }

    #[test]
    fn auto_action_round_trips() {
        let db = Database::open_in_memory(0).unwrap();
        let id = db
            .add_reminder(&NewReminder {
                user_id: 42,
                text: "post the video".to_string(),
                scheduled_at: now(),
                delivery: DeliveryKind::DirectMessage,
                channel_id: None,
                auto_action: Some(AutoAction::YoutubePost {
                    url: "https://youtu.be/xyz".to_string(),
                }),
            })
            .unwrap();
        let r = db.reminder_by_id(id).unwrap().unwrap();
        assert_eq!(
            r.auto_action,
            Some(AutoAction::YoutubePost {
                url: "https://youtu.be/xyz".to_string()
            })
        );
    }

    #[test]
    fn pending_filter_by_user() {
        let db = Database::open_in_memory(0).unwrap();
        reminder_at(&db, now() + Duration::minutes(1));
        db.add_reminder(&NewReminder {
            user_id: 99,
            text: "other user".to_string(),
            scheduled_at: now() + Duration::minutes(1),
            delivery: DeliveryKind::DirectMessage,
            channel_id: None,
            auto_action: None,
        })
        .unwrap();

        assert_eq!(db.pending_reminders(None).unwrap().len(), 2);
        assert_eq!(db.pending_reminders(Some(42)).unwrap().len(), 1);
    }
}
