use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Render a byte count for release listings.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".into();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Map a download position onto a slice of the overall operation percentage.
#[must_use]
pub fn scaled_percent(downloaded: u64, total: Option<u64>, start: f32, span: f32) -> f32 {
    match total {
        Some(total) if total > 0 => {
            let ratio = (downloaded as f32 / total as f32).min(1.0);
            start + ratio * span
        }
        _ => start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_speed_human_readable() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(2_048.0), "2.0 KB/s");
        assert_eq!(format_speed(5_242_880.0), "5.0 MB/s");
    }

    #[test]
    fn formats_byte_counts() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(900), "900 B");
        assert_eq!(format_bytes(1_536), "1.50 KB");
        assert_eq!(format_bytes(52_428_800), "50.00 MB");
    }

    #[test]
    fn scales_download_progress_into_range() {
        assert_eq!(scaled_percent(0, Some(10), 10.0, 40.0), 10.0);
        assert_eq!(scaled_percent(5, Some(10), 10.0, 40.0), 30.0);
        assert_eq!(scaled_percent(20, Some(10), 10.0, 40.0), 50.0);
        assert_eq!(scaled_percent(5, None, 10.0, 40.0), 10.0);
    }
}
