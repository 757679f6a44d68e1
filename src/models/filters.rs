use serde::{Deserialize, Serialize};

/// Named time windows for the session viewer. All classification happens
/// client-side over the already-fetched list.
///
/// `Today` compares calendar dates only; `Upcoming`/`Past` compare the
/// combined date+time instant against "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionWindow {
    Today,
    ThisWeek,
    ThisMonth,
    Upcoming,
    Past,
    All,
}
