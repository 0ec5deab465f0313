//! Host-state probes shared by the dashboard's `/api/stats` endpoint and
//! the patrol engine's daily status report. Each is a thin shell pipeline
//! run through [`crate::execute`] on demand — nothing is cached.

use crate::execute;

pub async fn load() -> String {
    execute("uptime").await.trim().to_string()
}

pub async fn mem_pct() -> String {
    execute(r#"free | awk '/Mem:/ {printf "%.1f", $3/$2*100}'"#).await.trim().to_string()
}

pub async fn mem_used_mb() -> String {
    execute("free -m | awk '/Mem:/ {print $3}'").await.trim().to_string()
}

pub async fn mem_total_mb() -> String {
    execute("free -m | awk '/Mem:/ {print $2}'").await.trim().to_string()
}

pub async fn disk_pct(mount: &str) -> String {
    execute(&format!("df -h {mount} | awk 'NR==2 {{print $5}}'")).await.trim().to_string()
}

pub async fn disk_avail(mount: &str) -> String {
    execute(&format!("df -h {mount} | awk 'NR==2 {{print $4}}'")).await.trim().to_string()
}

pub async fn tcp_established_count() -> String {
    execute("ss -tan state established | tail -n +2 | wc -l").await.trim().to_string()
}

pub async fn hostname() -> String {
    execute("hostname").await.trim().to_string()
}

pub async fn uptime_pretty() -> String {
    execute("uptime -p").await.trim().to_string()
}

/// `ip route get 1`'s source-address column, falling back to the first
/// address reported by `hostname -I` when the route lookup is empty or
/// fails.
pub async fn primary_ip() -> String {
    let primary = execute("ip route get 1 | awk '{print $7; exit}'").await;
    let trimmed = primary.trim();
    if !trimmed.is_empty() && !trimmed.contains("exit status") {
        trimmed.to_string()
    } else {
        execute("hostname -I | awk '{print $1}'").await.trim().to_string()
    }
}

/// Substitutes `N/A` for an empty or sandbox-wrapped-error result, the
/// convention used throughout the daily status report.
pub fn na_if_blank(value: String) -> String {
    if value.trim().is_empty() || value.contains("exit status") {
        "N/A".to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_if_blank_substitutes_empty() {
        assert_eq!(na_if_blank(String::new()), "N/A");
        assert_eq!(na_if_blank("   ".to_string()), "N/A");
    }

    #[test]
    fn na_if_blank_substitutes_wrapped_errors() {
        assert_eq!(na_if_blank("(Command failed: exit status 1)".to_string()), "N/A");
    }

    #[test]
    fn na_if_blank_preserves_real_values() {
        assert_eq!(na_if_blank("42".to_string()), "42");
    }
}
