//! Status/payment state editor.
//!
//! Both enums accept any transition; the one cross-field invariant is that
//! cancelling a session resets its payment status to `to_pay`. The reset
//! rides in the same update request as the status change — one patch, one
//! gateway call — so the two fields can never be observed out of step.

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Identity;
use crate::gateway::{self, Filter, Gateway, GatewayError, Row, Table};
use crate::models::enums::{PaymentStatus, SessionStatus};
use crate::models::session::Session;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// The payment status a status transition forces, if any. Cancelling always
/// lands on `to_pay`, overriding whatever was set before; every other status
/// keeps the current value.
pub fn forced_payment(new_status: SessionStatus, current: PaymentStatus) -> PaymentStatus {
    match new_status {
        SessionStatus::Cancelled => PaymentStatus::ToPay,
        _ => current,
    }
}

/// Sets a session's status. When the new status is `cancelled`, the same
/// patch carries `payment_status = to_pay`.
pub fn set_status<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    session_id: Uuid,
    new_status: SessionStatus,
) -> Result<Session, StatusError> {
    let mut patch = Row::new();
    patch.insert("status".into(), Value::String(new_status.as_str().into()));
    if new_status == SessionStatus::Cancelled {
        patch.insert(
            "payment_status".into(),
            Value::String(PaymentStatus::ToPay.as_str().into()),
        );
    }

    let filter = Filter::new()
        .eq("id", session_id.to_string())
        .eq("owner_id", identity.id.to_string());
    let rows = gateway.update(Table::Sessions, patch, &filter)?;
    Ok(gateway::single(Table::Sessions, rows)?)
}

/// Sets a session's payment status. No restrictions on the target value.
pub fn set_payment_status<G: Gateway>(
    gateway: &G,
    identity: &Identity,
    session_id: Uuid,
    new_payment: PaymentStatus,
) -> Result<Session, StatusError> {
    let mut patch = Row::new();
    patch.insert(
        "payment_status".into(),
        Value::String(new_payment.as_str().into()),
    );

    let filter = Filter::new()
        .eq("id", session_id.to_string())
        .eq("owner_id", identity.id.to_string());
    let rows = gateway.update(Table::Sessions, patch, &filter)?;
    Ok(gateway::single(Table::Sessions, rows)?)
}
