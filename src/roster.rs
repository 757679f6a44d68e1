//! Patient roster — add, edit, list and remove the practitioner's patients.
//!
//! Field formats are validated locally before any request: a failed check is
//! surfaced as a field-level message and nothing is sent to the gateway.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Identity;
use crate::collection::{Confirm, DeleteOutcome};
use crate::gateway::{self, Filter, Gateway, GatewayError, OrderBy, Row, Table};
use crate::models::patient::{NewPatient, Patient};

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Intentionally loose: one @, a dot somewhere after it, no whitespace.
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid literal pattern")
    })
}

/// Validates roster input against `today`. Public so forms can check fields
/// before submitting.
pub fn validate_patient(new: &NewPatient, today: NaiveDate) -> Result<(), RosterError> {
    if new.full_name.trim().is_empty() {
        return Err(RosterError::Validation {
            field: "full_name",
            message: "The patient's name is required.".into(),
        });
    }

    if let Some(email) = new.email.as_deref() {
        if !email_regex().is_match(email) {
            return Err(RosterError::Validation {
                field: "email",
                message: "This does not look like a valid email address.".into(),
            });
        }
    }

    if let Some(phone) = new.phone.as_deref() {
        let digits = phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+' | '.'))
            .collect::<String>();
        if digits.len() < 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(RosterError::Validation {
                field: "phone",
                message: "This does not look like a valid phone number.".into(),
            });
        }
    }

    if let Some(birth_date) = new.birth_date {
        if birth_date > today {
            return Err(RosterError::Validation {
                field: "birth_date",
                message: "The birth date cannot be in the future.".into(),
            });
        }
    }

    Ok(())
}

/// All patients on the practitioner's roster, alphabetically.
pub fn list_patients<G: Gateway>(
    gateway: &G,
    identity: &Identity,
) -> Result<Vec<Patient>, RosterError> {
    let filter = Filter::new().eq("owner_id", identity.id.to_string());
    let rows = gateway.select(Table::Patients, &filter, Some(&OrderBy::asc("full_name")))?;

    let mut patients = Vec::with_capacity(rows.len());
    for row in rows {
        patients.push(gateway::from_row::<Patient>(row)?);
    }
    Ok(patients)
}

/// Adds a patient after local validation.
pub fn add_patient<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    new: &NewPatient,
) -> Result<Patient, RosterError> {
    let today = Local::now().date_naive();
    validate_patient(new, today)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        owner_id: identity.id,
        full_name: new.full_name.trim().to_string(),
        email: new.email.clone(),
        phone: new.phone.clone(),
        birth_date: new.birth_date,
        notes: new.notes.clone(),
        created_at: Local::now().naive_local(),
    };
    gateway.insert(Table::Patients, gateway::to_row(&patient)?)?;
    tracing::info!("Added patient {}", patient.id);
    Ok(patient)
}

/// Replaces a patient's mutable fields after local validation. The update
/// predicate carries both the patient id and the owner id.
pub fn update_patient<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    patient_id: Uuid,
    new: &NewPatient,
) -> Result<Patient, RosterError> {
    let today = Local::now().date_naive();
    validate_patient(new, today)?;

    let mut patch = Row::new();
    patch.insert(
        "full_name".into(),
        serde_json::Value::String(new.full_name.trim().to_string()),
    );
    patch.insert("email".into(), option_value(new.email.as_deref()));
    patch.insert("phone".into(), option_value(new.phone.as_deref()));
    patch.insert(
        "birth_date".into(),
        new.birth_date
            .map(|d| serde_json::Value::String(d.to_string()))
            .unwrap_or(serde_json::Value::Null),
    );
    patch.insert("notes".into(), serde_json::Value::String(new.notes.clone()));

    let filter = Filter::new()
        .eq("id", patient_id.to_string())
        .eq("owner_id", identity.id.to_string());
    let rows = gateway.update(Table::Patients, patch, &filter)?;
    Ok(gateway::single(Table::Patients, rows)?)
}

/// Removes a patient permanently; requires explicit confirmation.
pub fn remove_patient<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    patient_id: Uuid,
    confirm: Confirm,
) -> Result<DeleteOutcome, RosterError> {
    if confirm == Confirm::Dismissed {
        return Ok(DeleteOutcome::NotConfirmed);
    }
    let filter = Filter::new()
        .eq("id", patient_id.to_string())
        .eq("owner_id", identity.id.to_string());
    gateway.delete(Table::Patients, &filter)?;
    Ok(DeleteOutcome::Deleted)
}

fn option_value(value: Option<&str>) -> serde_json::Value {
    match value {
        Some(s) => serde_json::Value::String(s.to_string()),
        None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqliteGateway;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "dr@example.com".into(),
        }
    }

    fn make_patient(name: &str) -> NewPatient {
        NewPatient {
            full_name: name.into(),
            email: Some("anna@example.com".into()),
            phone: Some("+49 30 1234567".into()),
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 2),
            notes: String::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
    }

    // ───────────────────────────────────────
    // validation tests
    // ───────────────────────────────────────

    #[test]
    fn blank_name_rejected() {
        let mut new = make_patient("  ");
        let result = validate_patient(&new, today());
        assert!(matches!(
            result.unwrap_err(),
            RosterError::Validation { field: "full_name", .. }
        ));
        new.full_name = "Anna Schmidt".into();
        assert!(validate_patient(&new, today()).is_ok());
    }

    #[test]
    fn bad_email_rejected_missing_email_allowed() {
        for bad in ["not-an-email", "two@@example.com", "no@dot", "spa ce@example.com"] {
            let mut new = make_patient("Anna Schmidt");
            new.email = Some(bad.into());
            let result = validate_patient(&new, today());
            assert!(
                matches!(result.unwrap_err(), RosterError::Validation { field: "email", .. }),
                "{bad} should be rejected"
            );
        }

        let mut new = make_patient("Anna Schmidt");
        new.email = None;
        assert!(validate_patient(&new, today()).is_ok());
    }

    #[test]
    fn phone_allows_separators_but_needs_digits() {
        for good in ["+49 30 1234567", "(030) 123-45-67", "0301234567"] {
            let mut new = make_patient("Anna Schmidt");
            new.phone = Some(good.into());
            assert!(validate_patient(&new, today()).is_ok(), "{good} should pass");
        }
        for bad in ["12345", "phone me", "123-456x"] {
            let mut new = make_patient("Anna Schmidt");
            new.phone = Some(bad.into());
            let result = validate_patient(&new, today());
            assert!(
                matches!(result.unwrap_err(), RosterError::Validation { field: "phone", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn future_birth_date_rejected() {
        let mut new = make_patient("Anna Schmidt");
        new.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let result = validate_patient(&new, today());
        assert!(matches!(
            result.unwrap_err(),
            RosterError::Validation { field: "birth_date", .. }
        ));
    }

    // ───────────────────────────────────────
    // CRUD tests
    // ───────────────────────────────────────

    #[test]
    fn add_then_list_alphabetical() {
        let gateway = SqliteGateway::open_memory().unwrap();
        let me = identity();

        add_patient(&gateway, &me, &make_patient("Clara Weber")).unwrap();
        add_patient(&gateway, &me, &make_patient("Anna Schmidt")).unwrap();

        let patients = list_patients(&gateway, &me).unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].full_name, "Anna Schmidt");
        assert_eq!(patients[1].full_name, "Clara Weber");
    }

    #[test]
    fn invalid_patient_sends_nothing() {
        let gateway = SqliteGateway::open_memory().unwrap();
        let me = identity();

        let mut new = make_patient("Anna Schmidt");
        new.email = Some("broken".into());
        assert!(add_patient(&gateway, &me, &new).is_err());
        assert!(list_patients(&gateway, &me).unwrap().is_empty());
    }

    #[test]
    fn roster_is_per_practitioner() {
        let gateway = SqliteGateway::open_memory().unwrap();
        let me = identity();
        let colleague = identity();

        add_patient(&gateway, &me, &make_patient("Anna Schmidt")).unwrap();
        add_patient(&gateway, &colleague, &make_patient("Ben Maier")).unwrap();

        let mine = list_patients(&gateway, &me).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].full_name, "Anna Schmidt");
    }

    #[test]
    fn update_replaces_fields_and_respects_ownership() {
        let gateway = SqliteGateway::open_memory().unwrap();
        let me = identity();
        let intruder = identity();
        let patient = add_patient(&gateway, &me, &make_patient("Anna Schmidt")).unwrap();

        let mut edit = make_patient("Anna Schmidt-Berg");
        edit.email = None;
        let updated = update_patient(&gateway, &me, patient.id, &edit).unwrap();
        assert_eq!(updated.full_name, "Anna Schmidt-Berg");
        assert!(updated.email.is_none());

        let result = update_patient(&gateway, &intruder, patient.id, &edit);
        assert!(matches!(
            result.unwrap_err(),
            RosterError::Gateway(GatewayError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_requires_confirmation() {
        let gateway = SqliteGateway::open_memory().unwrap();
        let me = identity();
        let patient = add_patient(&gateway, &me, &make_patient("Anna Schmidt")).unwrap();

        let outcome = remove_patient(&gateway, &me, patient.id, Confirm::Dismissed).unwrap();
        assert_eq!(outcome, DeleteOutcome::NotConfirmed);
        assert_eq!(list_patients(&gateway, &me).unwrap().len(), 1);

        let outcome = remove_patient(&gateway, &me, patient.id, Confirm::Confirmed).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(list_patients(&gateway, &me).unwrap().is_empty());
    }
}
