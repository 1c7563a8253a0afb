//! Shared utility functions

/// Normalize a Kenyan phone number to the `2547XXXXXXXX` form used by M-Pesa.
///
/// A leading `+` is dropped and a local `07…` prefix becomes `2547…`.
/// Anything else is returned unchanged.
pub fn normalize_msisdn(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    match digits.strip_prefix('0') {
        Some(rest) if rest.starts_with('7') => format!("254{rest}"),
        _ => digits.to_string(),
    }
}
