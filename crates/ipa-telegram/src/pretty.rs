//! Human-readable sizes and durations for log lines.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Render a byte count as `Nbytes`, `x.xxKb`, `x.xxMb` or `x.xxGb`.
pub fn pretty_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2}Gb", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2}Mb", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2}Kb", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes}bytes")
    }
}

/// Render milliseconds as `N ms` below one second, `x.xx sec` otherwise.
pub fn pretty_duration_ms(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.2} sec", duration_ms as f64 / 1000.0)
    } else {
        format!("{duration_ms} ms")
    }
}
