//! Markdown rendering for patrol alerts and daily status reports.

use crate::probes::{Anomaly, AnomalyCategory};

fn category_label(category: &AnomalyCategory) -> String {
    match category {
        AnomalyCategory::Disk => "磁盘告警".to_string(),
        AnomalyCategory::Load => "负载告警".to_string(),
        AnomalyCategory::Oom => "内存溢出告警".to_string(),
        AnomalyCategory::Zombie => "僵尸进程告警".to_string(),
        AnomalyCategory::Custom(name) => format!("巡检规则告警：{name}"),
        AnomalyCategory::Http(name) => format!("HTTP 探测告警：{name}"),
    }
}

pub fn format_evidence_block(anomaly: &Anomaly) -> String {
    format!("**{}**\n```\n{}\n```", category_label(&anomaly.category), anomaly.evidence)
}

pub fn build_alert_title(host: &str) -> String {
    format!("🚨 {host} 主机巡检告警")
}

pub fn build_alert_body(host: &str, anomalies: &[Anomaly], analysis: &str) -> String {
    let mut body = format!("## 🚨 {host} 主机巡检告警\n\n");
    for anomaly in anomalies {
        body.push_str(&format_evidence_block(anomaly));
        body.push_str("\n\n");
    }
    body.push_str(&format!("**AI 分析**\n{analysis}\n"));
    body
}

pub struct DailyStatus {
    pub host: String,
    pub ip: String,
    pub uptime: String,
    pub mem_pct: String,
    pub mem_used_mb: String,
    pub mem_total_mb: String,
    pub disk_pct: String,
    pub disk_avail: String,
    pub load: String,
    pub tcp_established: String,
}

pub fn build_status_title(host: &str) -> String {
    format!("{host} 每日状态报告")
}

pub fn build_status_body(status: &DailyStatus) -> String {
    format!(
        "## {host} 系统状态\n\n\
         | 指标 | 值 |\n\
         |---|---|\n\
         | IP | {ip} |\n\
         | 运行时间 | {uptime} |\n\
         | 负载 | {load} |\n\
         | 内存使用率 | {mem_pct}% |\n\
         | 内存 (已用/总计 MB) | {mem_used}/{mem_total} |\n\
         | 根分区磁盘使用率 | {disk_pct} |\n\
         | 根分区可用空间 | {disk_avail} |\n\
         | TCP ESTABLISHED 连接数 | {tcp} |\n",
        host = status.host,
        ip = status.ip,
        uptime = status.uptime,
        load = status.load,
        mem_pct = status.mem_pct,
        mem_used = status.mem_used_mb,
        mem_total = status.mem_total_mb,
        disk_pct = status.disk_pct,
        disk_avail = status.disk_avail,
        tcp = status.tcp_established,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_alert_body_contains_marked_section_and_evidence() {
        let anomaly = Anomaly { category: AnomalyCategory::Disk, evidence: "/dev/vda1 100G 92G 8G 92% /".to_string() };
        let body = build_alert_body("host-1", &[anomaly], "原因：磁盘空间不足\n修复：清理日志文件");
        assert!(body.contains("**磁盘告警**"));
        assert!(body.contains("/dev/vda1"));
        assert!(body.contains("92%"));
        assert!(body.contains("```"));
    }

    #[test]
    fn status_body_renders_all_fields() {
        let status = DailyStatus {
            host: "host-1".to_string(),
            ip: "10.0.0.5".to_string(),
            uptime: "up 3 days".to_string(),
            mem_pct: "42.1".to_string(),
            mem_used_mb: "512".to_string(),
            mem_total_mb: "2048".to_string(),
            disk_pct: "55%".to_string(),
            disk_avail: "20G".to_string(),
            load: "0.10, 0.05, 0.01".to_string(),
            tcp_established: "7".to_string(),
        };
        let body = build_status_body(&status);
        assert!(body.contains("10.0.0.5"));
        assert!(body.contains("42.1%"));
        assert!(body.contains("512/2048"));
    }
}
