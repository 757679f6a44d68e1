//! Session viewer — time-windowed projections, calendar grids, payment
//! breakdowns and financial aggregates over a practitioner's session list,
//! plus thin gateway delegation for fetching and booking.
//!
//! All classification is computed client-side over the already-fetched list;
//! every function that depends on "now" takes the current instant as a
//! parameter.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Identity;
use crate::collection::{Confirm, DeleteOutcome};
use crate::gateway::{self, Filter, Gateway, GatewayError, OrderBy, Row, Table};
use crate::models::enums::{PaymentStatus, SessionDuration, SessionStatus};
use crate::models::filters::SessionWindow;
use crate::models::session::{NewSession, Session};

/// Month-view cells show at most this many sessions before overflowing
/// into a counter.
pub const GRID_VISIBLE_PER_DAY: usize = 2;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

// ─── Meeting integration (external collaborator) ──────────────────────────────

#[derive(Error, Debug)]
pub enum MeetingError {
    #[error("Meeting provider error: {0}")]
    Provider(String),
}

/// Calendar/meeting collaborator. Only consulted at booking time; failure is
/// non-fatal — the session is created without a link.
pub trait MeetingScheduler {
    fn create_meeting(
        &self,
        access_token: &str,
        title: &str,
        start: NaiveDateTime,
        duration: SessionDuration,
        attendee_email: &str,
    ) -> Result<Option<String>, MeetingError>;
}

// ─── Gateway delegation ───────────────────────────────────────────────────────

/// All sessions for the practitioner, ordered by date then time.
pub fn fetch_sessions<G: Gateway>(
    gateway: &G,
    identity: &Identity,
) -> Result<Vec<Session>, ScheduleError> {
    let filter = Filter::new().eq("owner_id", identity.id.to_string());
    let rows = gateway.select(Table::Sessions, &filter, Some(&OrderBy::asc("date")))?;

    let mut sessions = Vec::with_capacity(rows.len());
    for row in rows {
        sessions.push(gateway::from_row::<Session>(row)?);
    }
    sessions.sort_by_key(Session::start);
    Ok(sessions)
}

/// Books a session, asking the meeting collaborator for a link when an
/// access token and an attendee email are both available.
pub fn book_session<G: Gateway>(
    gateway: &G,
    meeting: Option<(&dyn MeetingScheduler, &str)>,
    identity: &Identity,
    new: &NewSession,
) -> Result<Session, ScheduleError> {
    if new.title.trim().is_empty() {
        return Err(ScheduleError::Validation {
            field: "title",
            message: "A title is required before booking a session.".into(),
        });
    }
    if new.fee < 0.0 {
        return Err(ScheduleError::Validation {
            field: "fee",
            message: "The fee cannot be negative.".into(),
        });
    }

    let start = new.date.and_time(new.time);
    let meeting_link = match (meeting, new.attendee_email.as_deref()) {
        (Some((scheduler, token)), Some(email)) => {
            match scheduler.create_meeting(token, &new.title, start, new.duration, email) {
                Ok(link) => link,
                Err(e) => {
                    tracing::warn!("Meeting creation failed, booking without link: {e}");
                    None
                }
            }
        }
        _ => None,
    };

    let session = Session {
        id: Uuid::new_v4(),
        owner_id: identity.id,
        subject_id: new.subject_id,
        title: new.title.trim().to_string(),
        date: new.date,
        time: new.time,
        duration: new.duration,
        status: SessionStatus::Scheduled,
        payment_status: PaymentStatus::ToPay,
        fee: new.fee,
        notes: new.notes.clone(),
        meeting_link,
    };
    gateway.insert(Table::Sessions, gateway::to_row(&session)?)?;
    tracing::info!("Booked session {} on {}", session.id, session.date);
    Ok(session)
}

/// Replaces a session's free-text notes.
pub fn update_session_notes<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    session_id: Uuid,
    notes: &str,
) -> Result<Session, ScheduleError> {
    let mut patch = Row::new();
    patch.insert("notes".into(), serde_json::Value::String(notes.to_string()));
    let filter = Filter::new()
        .eq("id", session_id.to_string())
        .eq("owner_id", identity.id.to_string());
    let rows = gateway.update(Table::Sessions, patch, &filter)?;
    Ok(gateway::single(Table::Sessions, rows)?)
}

/// Deletes a session permanently; requires explicit confirmation.
pub fn delete_session<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    session_id: Uuid,
    confirm: Confirm,
) -> Result<DeleteOutcome, ScheduleError> {
    if confirm == Confirm::Dismissed {
        return Ok(DeleteOutcome::NotConfirmed);
    }
    let filter = Filter::new()
        .eq("id", session_id.to_string())
        .eq("owner_id", identity.id.to_string());
    gateway.delete(Table::Sessions, &filter)?;
    Ok(DeleteOutcome::Deleted)
}

// ─── Time-windowed views ──────────────────────────────────────────────────────

/// First day (Monday) of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The seven days of the ISO week containing `date`, Monday first.
pub fn week_days(date: NaiveDate) -> [NaiveDate; 7] {
    let monday = week_start(date);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Filters the list down to the named window.
pub fn filter_window<'a>(
    sessions: &'a [Session],
    window: SessionWindow,
    now: NaiveDateTime,
) -> Vec<&'a Session> {
    let today = now.date();
    sessions
        .iter()
        .filter(|s| match window {
            SessionWindow::Today => s.date == today,
            SessionWindow::ThisWeek => {
                let monday = week_start(today);
                s.date >= monday && s.date < monday + Duration::days(7)
            }
            SessionWindow::ThisMonth => {
                s.date.year() == today.year() && s.date.month() == today.month()
            }
            SessionWindow::Upcoming => s.start() >= now,
            SessionWindow::Past => s.start() < now,
            SessionWindow::All => true,
        })
        .collect()
}

/// Sessions on one calendar day, ordered by time.
pub fn sessions_on<'a>(sessions: &'a [Session], date: NaiveDate) -> Vec<&'a Session> {
    let mut on_day: Vec<&Session> = sessions.iter().filter(|s| s.date == date).collect();
    on_day.sort_by_key(|s| s.time);
    on_day
}

// ─── Month grid ───────────────────────────────────────────────────────────────

/// Compact session reference for grid cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub time: NaiveTime,
    pub status: SessionStatus,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            time: session.time,
            status: session.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    /// Leading pad cell before day 1.
    Blank,
    Day {
        day: u32,
        visible: Vec<SessionSummary>,
        /// Sessions beyond the visible cap on this day.
        overflow: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<GridCell>,
}

/// Builds the month view: one leading blank per weekday index of day 1
/// (Sunday-first, matching the rendered calendar), then one cell per
/// calendar day with up to [`GRID_VISIBLE_PER_DAY`] sessions and an
/// overflow counter.
pub fn month_grid(sessions: &[Session], year: i32, month: u32) -> MonthGrid {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        tracing::warn!("Invalid month {year}-{month} for grid");
        return MonthGrid { year, month, cells: Vec::new() };
    };

    let offset = first.weekday().num_days_from_sunday();
    let mut cells: Vec<GridCell> = (0..offset).map(|_| GridCell::Blank).collect();

    for day in 1..=days_in_month(first) {
        // Day numbers within 1..=days_in_month are always valid.
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        let on_day = sessions_on(sessions, date);
        let visible: Vec<SessionSummary> = on_day
            .iter()
            .take(GRID_VISIBLE_PER_DAY)
            .map(|s| SessionSummary::from(*s))
            .collect();
        cells.push(GridCell::Day {
            day,
            visible,
            overflow: on_day.len().saturating_sub(GRID_VISIBLE_PER_DAY),
        });
    }

    MonthGrid { year, month, cells }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    match next {
        Some(next) => (next - first).num_days() as u32,
        None => 0,
    }
}

// ─── Payments and finances ────────────────────────────────────────────────────

fn is_collected(status: PaymentStatus) -> bool {
    matches!(status, PaymentStatus::Paid | PaymentStatus::InvoiceIssued)
}

/// One line in the payment breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEntry {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub fee: f64,
}

impl From<&Session> for PaymentEntry {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            subject_id: session.subject_id,
            title: session.title.clone(),
            date: session.date,
            fee: session.fee,
        }
    }
}

/// Payment-focused partition of the session list: unpaid sessions whose
/// instant has passed (overdue), unpaid sessions still ahead, and collected
/// sessions of the current month.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentBreakdown {
    pub overdue: Vec<PaymentEntry>,
    pub overdue_total: f64,
    pub awaiting: Vec<PaymentEntry>,
    pub awaiting_total: f64,
    pub settled: Vec<PaymentEntry>,
    pub settled_total: f64,
}

pub fn payment_breakdown(sessions: &[Session], now: NaiveDateTime) -> PaymentBreakdown {
    let mut breakdown = PaymentBreakdown::default();
    let today = now.date();

    for session in sessions {
        match session.payment_status {
            PaymentStatus::ToPay => {
                if session.start() < now {
                    breakdown.overdue_total += session.fee;
                    breakdown.overdue.push(PaymentEntry::from(session));
                } else {
                    breakdown.awaiting_total += session.fee;
                    breakdown.awaiting.push(PaymentEntry::from(session));
                }
            }
            PaymentStatus::Paid | PaymentStatus::InvoiceIssued => {
                if session.date.year() == today.year() && session.date.month() == today.month() {
                    breakdown.settled_total += session.fee;
                    breakdown.settled.push(PaymentEntry::from(session));
                }
            }
        }
    }
    breakdown
}

/// Collected-fee totals for a selected month/year and the periods before
/// them, with integer percentage change.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceSummary {
    pub month_total: f64,
    pub previous_month_total: f64,
    pub month_change_pct: i64,
    pub year_total: f64,
    pub previous_year_total: f64,
    pub year_change_pct: i64,
}

/// Sums `fee` over sessions whose payment status is paid or invoice_issued,
/// independently for the selected month, the selected year, and the periods
/// immediately before them.
pub fn finance_summary(sessions: &[Session], year: i32, month: u32) -> FinanceSummary {
    let (prev_year_of_month, prev_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };

    let mut month_total = 0.0;
    let mut previous_month_total = 0.0;
    let mut year_total = 0.0;
    let mut previous_year_total = 0.0;

    for session in sessions {
        if !is_collected(session.payment_status) {
            continue;
        }
        let (y, m) = (session.date.year(), session.date.month());
        if y == year && m == month {
            month_total += session.fee;
        }
        if y == prev_year_of_month && m == prev_month {
            previous_month_total += session.fee;
        }
        if y == year {
            year_total += session.fee;
        }
        if y == year - 1 {
            previous_year_total += session.fee;
        }
    }

    FinanceSummary {
        month_total,
        previous_month_total,
        month_change_pct: percent_change(month_total, previous_month_total),
        year_total,
        previous_year_total,
        year_change_pct: percent_change(year_total, previous_year_total),
    }
}

/// Integer percentage change between two period sums. Reports 0 when the
/// previous period's sum is 0 — a deliberate floor, not a true percentage.
pub fn percent_change(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return 0;
    }
    ((current - previous) / previous * 100.0).round() as i64
}
