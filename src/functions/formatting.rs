use chrono::{DateTime, Local, Utc};

/// Wall-clock time of an event in the local timezone.
#[inline]
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[inline]
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Cut `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0), "0ms");
        assert_eq!(format_duration_ms(850), "850ms");
        assert_eq!(format_duration_ms(1300), "1.3s");
        assert_eq!(format_duration_ms(125_000), "2m 05s");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
        assert_eq!(truncate("publishing", 6), "publi…");
        assert_eq!(truncate("ünïcødé", 4), "ünï…");
        assert_eq!(truncate("anything", 0), "");
    }

    #[test]
    fn test_format_time_shape() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T12:34:56Z")
            .unwrap()
            .with_timezone(&Utc);
        let s = format_time(&at);
        assert_eq!(s.len(), 8);
        assert!(s.ends_with(":56"));
    }
}
