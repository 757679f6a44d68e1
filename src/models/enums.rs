use crate::gateway::GatewayError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same snake_case spelling, so gateway rows and the
/// string form stay interchangeable.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = GatewayError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(GatewayError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(SessionStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(PaymentStatus {
    ToPay => "to_pay",
    Paid => "paid",
    InvoiceIssued => "invoice_issued",
});

str_enum!(CollectionKind {
    Notes => "notes",
    TreatmentPlans => "treatment_plans",
});

impl CollectionKind {
    pub fn table(&self) -> crate::gateway::Table {
        match self {
            Self::Notes => crate::gateway::Table::Notes,
            Self::TreatmentPlans => crate::gateway::Table::TreatmentPlans,
        }
    }
}

/// Session length — the fixed set of durations the practice offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SessionDuration {
    Min30,
    Min45,
    Min60,
    Min90,
    Min120,
}

impl SessionDuration {
    pub fn as_minutes(&self) -> u32 {
        match self {
            Self::Min30 => 30,
            Self::Min45 => 45,
            Self::Min60 => 60,
            Self::Min90 => 90,
            Self::Min120 => 120,
        }
    }

    pub const ALL: [SessionDuration; 5] = [
        Self::Min30,
        Self::Min45,
        Self::Min60,
        Self::Min90,
        Self::Min120,
    ];
}

impl TryFrom<u32> for SessionDuration {
    type Error = GatewayError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            30 => Ok(Self::Min30),
            45 => Ok(Self::Min45),
            60 => Ok(Self::Min60),
            90 => Ok(Self::Min90),
            120 => Ok(Self::Min120),
            _ => Err(GatewayError::InvalidEnum {
                field: "SessionDuration".into(),
                value: minutes.to_string(),
            }),
        }
    }
}

impl From<SessionDuration> for u32 {
    fn from(duration: SessionDuration) -> u32 {
        duration.as_minutes()
    }
}
