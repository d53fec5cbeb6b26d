//! Rendering of recalled records into prompt-ready history text.

use crate::model::Record;

/// Rendered when a query matched nothing.
pub const NO_HISTORY: &str = "No relevant history found.";

/// Separator between rendered records.
const RECORD_SEPARATOR: &str = "\n---\n";

/// Render records in the given order as `PAST <ROLE> MESSAGE:` blocks.
pub fn render_history(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_HISTORY.to_string();
    }
    records
        .iter()
        .map(|record| {
            format!(
                "PAST {} MESSAGE:\n{}",
                record.role.as_str().to_uppercase(),
                record.text
            )
        })
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}
