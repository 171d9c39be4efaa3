//! Human-readable byte counts for the size report shown after compression

const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

/// Render a byte count with a 1024 base, rounded to two decimals
///
/// ```rust
/// use imgutil::utils::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS.get(unit_index).unwrap_or(&"Bytes"))
}

/// Signed percentage saved: `round((1 - compressed / original) * 100)`
#[must_use]
pub fn compression_ratio(original_bytes: u64, compressed_bytes: u64) -> Option<i64> {
    if original_bytes == 0 {
        return None;
    }
    let ratio = 1.0 - compressed_bytes as f64 / original_bytes as f64;
    Some((ratio * 100.0).round() as i64)
}
