use crate::models::enums::CollectionKind;

/// Application-level constants
pub const APP_NAME: &str = "Praxis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-collection presentation configuration: the label shown above the
/// list, the composer prompt, and the validation message surfaced when a
/// draft is submitted without a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub kind: CollectionKind,
    pub label: String,
    pub title_prompt: String,
    pub missing_title_message: String,
}

impl CollectionConfig {
    /// Default copy for each collection kind.
    pub fn for_kind(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Notes => Self {
                kind,
                label: "Clinical notes".into(),
                title_prompt: "Give this note a title".into(),
                missing_title_message: "A title is required before saving a note.".into(),
            },
            CollectionKind::TreatmentPlans => Self {
                kind,
                label: "Treatment plans".into(),
                title_prompt: "Give this treatment plan a title".into(),
                missing_title_message: "A title is required before saving a treatment plan.".into(),
            },
        }
    }
}
