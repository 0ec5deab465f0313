//! The fixed anomaly-detection battery plus user-supplied rule probes.

use hostwatch_config::{HttpRule, PatrolRule};
use hostwatch_sandbox::execute;

#[derive(Debug, Clone)]
pub enum AnomalyCategory {
    Disk,
    Load,
    Oom,
    Zombie,
    Custom(String),
    Http(String),
}

#[derive(Debug, Clone)]
pub struct Anomaly {
    pub category: AnomalyCategory,
    pub evidence: String,
}

const SKIP_DEVICE_MARKERS: &[&str] = &["/dev/loop", "loop"];
const SKIP_MOUNT_MARKERS: &[&str] = &["/snap", "/hostfs"];
const SKIP_ROW_MARKERS: &[&str] = &["tmpfs", "overlay", "cdrom", "efivarfs"];
const DISK_USAGE_THRESHOLD: u32 = 85;
const LOAD_THRESHOLD: f64 = 4.0;

/// `true` when a sandbox result should be treated as no-anomaly because it
/// is a wrapped shell failure rather than real output.
fn is_wrapped_failure(output: &str) -> bool {
    output.contains("exit status")
}

pub async fn probe_disk() -> Vec<Anomaly> {
    let output = execute("df -h").await;
    if is_wrapped_failure(&output) {
        return vec![];
    }

    let mut anomalies = Vec::new();
    for line in output.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }
        let device = fields[0];
        let mountpoint = fields[5];
        let lower_line = line.to_lowercase();

        if SKIP_DEVICE_MARKERS.iter().any(|m| device.contains(m)) {
            continue;
        }
        if SKIP_MOUNT_MARKERS.iter().any(|m| mountpoint.contains(m)) {
            continue;
        }
        if SKIP_ROW_MARKERS.iter().any(|m| lower_line.contains(m)) {
            continue;
        }

        let Some(pct) = fields[4].trim_end_matches('%').parse::<u32>().ok() else {
            continue;
        };
        if pct > DISK_USAGE_THRESHOLD {
            anomalies.push(Anomaly { category: AnomalyCategory::Disk, evidence: line.to_string() });
        }
    }
    anomalies
}

pub async fn probe_load() -> Vec<Anomaly> {
    let output = execute("uptime").await;
    if is_wrapped_failure(&output) {
        return vec![];
    }

    let lower = output.to_lowercase();
    let Some(idx) = lower.find("load average:") else {
        return vec![];
    };
    let after = &output[idx + "load average:".len()..];
    let Some(one_minute) = after.split(',').next().and_then(|s| s.trim().parse::<f64>().ok()) else {
        return vec![];
    };

    if one_minute > LOAD_THRESHOLD {
        vec![Anomaly { category: AnomalyCategory::Load, evidence: output.trim().to_string() }]
    } else {
        vec![]
    }
}

/// Classifies one `dmesg` probe result. Separated from `probe_oom` so the
/// permission-denial filter can be exercised without shelling out.
fn oom_anomaly_from_output(output: &str) -> Option<Anomaly> {
    if output.trim().is_empty() || is_wrapped_failure(output) {
        return None;
    }
    if output.contains("Operation not permitted") || output.contains("不允许的操作") {
        return None;
    }
    Some(Anomaly { category: AnomalyCategory::Oom, evidence: output.trim().to_string() })
}

pub async fn probe_oom() -> Vec<Anomaly> {
    let output = execute("dmesg | grep -i 'out of memory' | tail -n 5").await;
    oom_anomaly_from_output(&output).into_iter().collect()
}

pub async fn probe_zombies() -> Vec<Anomaly> {
    let output = execute("ps -A -o stat,ppid,pid,cmd | awk '$1 ~ /^[Zz]/'").await;
    if output.trim().is_empty() || is_wrapped_failure(&output) {
        return vec![];
    }
    let evidence = format!("STAT PPID PID CMD\n{}", output.trim());
    vec![Anomaly { category: AnomalyCategory::Zombie, evidence }]
}

pub async fn probe_custom_rule(rule: &PatrolRule) -> Vec<Anomaly> {
    let output = execute(&rule.command).await;
    if output.trim().is_empty() || is_wrapped_failure(&output) {
        return vec![];
    }
    vec![Anomaly { category: AnomalyCategory::Custom(rule.name.clone()), evidence: output.trim().to_string() }]
}

pub async fn probe_http_rule(rule: &HttpRule, client: &reqwest::Client) -> Vec<Anomaly> {
    match client.get(&rule.url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status == rule.code {
                vec![]
            } else {
                vec![Anomaly {
                    category: AnomalyCategory::Http(rule.name.clone()),
                    evidence: format!("expected status {}, got {}", rule.code, status),
                }]
            }
        }
        Err(err) => vec![Anomaly {
            category: AnomalyCategory::Http(rule.name.clone()),
            evidence: format!("transport error: {err}"),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_row(device: &str, pct: &str, mount: &str) -> String {
        format!("{device}  100G  10G  90G  {pct}  {mount}")
    }

    #[test]
    fn wrapped_failure_is_not_an_anomaly_source() {
        assert!(is_wrapped_failure("(Command failed: exit status 1)"));
        assert!(!is_wrapped_failure("Filesystem Size Used Avail Use% Mounted"));
    }

    #[test]
    fn disk_row_parsing_skips_loop_and_snap_mounts() {
        let header = "Filesystem Size Used Avail Use% Mounted";
        let rows = [
            header.to_string(),
            disk_row("/dev/loop0", "99%", "/snap/core/x"),
            disk_row("/dev/vda1", "92%", "/"),
        ];
        let text = rows.join("\n");

        let mut anomalies = Vec::new();
        for line in text.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let device = fields[0];
            let mountpoint = fields[5];
            if SKIP_DEVICE_MARKERS.iter().any(|m| device.contains(m))
                || SKIP_MOUNT_MARKERS.iter().any(|m| mountpoint.contains(m))
            {
                continue;
            }
            let pct: u32 = fields[4].trim_end_matches('%').parse().unwrap();
            if pct > DISK_USAGE_THRESHOLD {
                anomalies.push(line.to_string());
            }
        }

        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].contains("/dev/vda1"));
    }

    #[test]
    fn oom_probe_silences_permission_denial() {
        let sample = "dmesg: read kernel buffer failed: Operation not permitted";
        assert!(oom_anomaly_from_output(sample).is_none());
    }

    #[test]
    fn oom_probe_flags_real_evidence() {
        let sample = "[12345.6] Out of memory: Killed process 999 (java)";
        let anomaly = oom_anomaly_from_output(sample).unwrap();
        assert!(matches!(anomaly.category, AnomalyCategory::Oom));
        assert!(anomaly.evidence.contains("Killed process 999"));
    }

    #[test]
    fn oom_probe_ignores_wrapped_shell_failure() {
        assert!(oom_anomaly_from_output("(Command failed: exit status 1)").is_none());
    }

    #[tokio::test]
    async fn http_probe_flags_status_mismatch() {
        let client = reqwest::Client::new();
        let rule = HttpRule { name: "unreachable".to_string(), url: "http://127.0.0.1:1/".to_string(), code: 200 };
        let anomalies = probe_http_rule(&rule, &client).await;
        assert_eq!(anomalies.len(), 1);
        assert!(matches!(anomalies[0].category, AnomalyCategory::Http(_)));
    }
}
