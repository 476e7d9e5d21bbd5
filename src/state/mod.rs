pub mod gate;
pub mod report;
pub mod store;

pub use gate::{AutomationGate, FlagRecord};
pub use report::{RunReport, ValidationCheck, ValidationReport, validate};
pub use store::{ProcessingState, StateStore};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
