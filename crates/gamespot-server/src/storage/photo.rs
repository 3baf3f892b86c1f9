//! Photo receipt normalisation.

/// Prefix used when a client sends bare base64 bytes.
pub const DEFAULT_PREFIX: &str = "data:image/jpeg;base64,";

/// Turn a client-supplied photo into the stored data URL.
///
/// Values that already carry an image data-URL prefix pass through
/// untouched; bare payloads get [`DEFAULT_PREFIX`]. Absent or blank input
/// is `None`, never an empty string. Applying this twice changes nothing.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    if raw.starts_with("data:image") {
        Some(raw.to_string())
    } else {
        Some(format!("{DEFAULT_PREFIX}{raw}"))
    }
}
