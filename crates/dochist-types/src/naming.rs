/// Suffix appended to a primary collection's name to name its history.
pub const HISTORY_SUFFIX: &str = "_history";

/// Derive the history collection name for a primary collection.
///
/// A custom name, when supplied, is used verbatim.
pub fn history_collection_name(collection: &str, custom: Option<&str>) -> String {
    match custom {
        Some(name) => name.to_string(),
        None => format!("{collection}{HISTORY_SUFFIX}"),
    }
}
