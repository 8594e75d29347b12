//! Human-readable file size and upload time formatting
//!
//! Used in CLI output, logs and upload history records.

/// Unit labels for `format_file_size` (powers of 1024)
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Default connection speed for upload time estimates (Mbps)
pub const DEFAULT_CONNECTION_SPEED_MBPS: f64 = 10.0;

/// Format a byte count with two decimals in the largest fitting unit.
///
/// # Examples
///
/// ```
/// use coohom_common::human_size::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 B");
/// assert_eq!(format_file_size(512), "512.00 B");
/// assert_eq!(format_file_size(1536), "1.50 KB");
/// assert_eq!(format_file_size(200 * 1024 * 1024), "200.00 MB");
/// ```
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

/// Estimate upload time for a file at the given connection speed.
///
/// Returns `~N seconds` under a minute, `~N.N minutes` under an hour,
/// otherwise `~N.N hours`.
///
/// # Examples
///
/// ```
/// use coohom_common::human_size::estimate_upload_time;
///
/// assert_eq!(estimate_upload_time(10 * 1024 * 1024, 10.0), "~8 seconds");
/// assert_eq!(estimate_upload_time(100 * 1024 * 1024, 1.0), "~13.3 minutes");
/// ```
pub fn estimate_upload_time(size_bytes: u64, connection_speed_mbps: f64) -> String {
    // Guard against a zero or negative speed from user input
    let speed = if connection_speed_mbps > 0.0 {
        connection_speed_mbps
    } else {
        DEFAULT_CONNECTION_SPEED_MBPS
    };

    let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
    let seconds = (size_mb * 8.0) / speed;

    if seconds < 60.0 {
        format!("~{:.0} seconds", seconds)
    } else if seconds < 3600.0 {
        format!("~{:.1} minutes", seconds / 60.0)
    } else {
        format!("~{:.1} hours", seconds / 3600.0)
    }
}
