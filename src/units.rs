use chrono::{Local, TimeZone};

// Decimal steps, not 1024: the history file stores plain bytes per second
// and the display has always divided by 1000.
const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

pub fn format_speed(bytes_per_sec: f64) -> String {
    let mut speed = bytes_per_sec;
    let mut unit = 0;
    while speed >= 1000.0 && unit < UNITS.len() - 1 {
        speed /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", speed, UNITS[unit])
}

pub fn format_timestamp(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(when) => when.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{epoch_ms}ms"),
    }
}
