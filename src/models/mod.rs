pub mod content;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod session;

pub use content::{ContentDraft, ContentRecord};
pub use enums::{CollectionKind, PaymentStatus, SessionDuration, SessionStatus};
pub use filters::SessionWindow;
pub use patient::{NewPatient, Patient};
pub use session::{NewSession, Session};
