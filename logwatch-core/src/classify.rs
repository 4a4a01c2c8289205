use crate::model::LogLevel;

/// Derive a level from free-form message text.
///
/// Case-insensitive substring checks, first hit wins:
/// "error" or "fatal" -> ERROR, "warn" -> WARNING, "debug" -> DEBUG,
/// anything else -> INFO. Non-English or coded severity tokens are not
/// recognised and fall through to INFO.
pub fn classify_level(message: &str) -> LogLevel {
    let lower = message.to_lowercase();

    if lower.contains("error") || lower.contains("fatal") {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warning
    } else if lower.contains("debug") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}
