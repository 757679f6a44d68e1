use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{PaymentStatus, SessionDuration, SessionStatus};

/// A therapy session (appointment) owned by one practitioner.
///
/// `status` and `payment_status` are independent axes except for one forced
/// transition: cancelling a session resets its payment status to `to_pay`
/// in the same update (see `status::set_status`). `meeting_link` is filled
/// at booking time if the meeting integration is connected and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(rename = "duration_min")]
    pub duration: SessionDuration,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    pub fee: f64,
    pub notes: String,
    pub meeting_link: Option<String>,
}

impl Session {
    /// The session's combined date+time instant, used for past/upcoming
    /// classification.
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Booking input for a new session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub subject_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: SessionDuration,
    pub fee: f64,
    pub notes: String,
    /// Invitee for the meeting integration, when the patient has one on file.
    pub attendee_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_combines_date_and_time() {
        let session = Session {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            title: "Weekly session".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            duration: SessionDuration::Min60,
            status: SessionStatus::Scheduled,
            payment_status: PaymentStatus::ToPay,
            fee: 75.0,
            notes: String::new(),
            meeting_link: None,
        };
        let start = session.start();
        assert_eq!(start.date(), session.date);
        assert_eq!(start.time(), session.time);
    }

    #[test]
    fn serde_uses_storage_column_names() {
        let session = Session {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            title: "Weekly session".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            duration: SessionDuration::Min45,
            status: SessionStatus::NoShow,
            payment_status: PaymentStatus::InvoiceIssued,
            fee: 75.0,
            notes: String::new(),
            meeting_link: Some("https://meet.example/abc".into()),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["duration_min"], serde_json::Value::from(45));
        assert_eq!(value["status"], serde_json::Value::from("no_show"));
        assert_eq!(value["payment_status"], serde_json::Value::from("invoice_issued"));

        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }
}
