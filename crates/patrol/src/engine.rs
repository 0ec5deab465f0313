//! The patrol engine: drives the fixed anomaly battery plus user-defined
//! rules on a 5-minute cadence, and a markdown status report on a
//! configurable-hour cadence, delivering both through the notifier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hostwatch_config::AppConfig;
use hostwatch_llm::LlmClient;
use hostwatch_logring::LogRing;
use hostwatch_notify::{Notifier, NotifierConfig};
use hostwatch_sandbox::stats;

use crate::prompts::analyze;
use crate::report::{build_alert_body, build_alert_title, build_status_body, build_status_title, DailyStatus};
use crate::{probes, Anomaly};

const PATROL_INTERVAL_SECS: u64 = 5 * 60;
const STATUS_REPORT_INITIAL_DELAY_SECS: u64 = 30;
const ROOT_MOUNT: &str = "/";

pub struct PatrolEngine {
    config: AppConfig,
    llm: LlmClient,
    notifier: Notifier,
    ring: Arc<LogRing>,
    http_client: reqwest::Client,
    in_flight: Arc<AtomicBool>,
}

impl PatrolEngine {
    pub fn new(config: AppConfig, ring: Arc<LogRing>) -> Self {
        let llm = LlmClient::new(config.llm.base_url.clone(), config.llm.api_key.clone(), config.llm.model.clone());
        let notifier_config = NotifierConfig {
            webhook_url: Some(config.webhook.clone()),
            telegram_token: Some(config.telegram_token.clone()),
            telegram_chat_id: Some(config.telegram_chat_id.clone()),
        };
        let notifier = Notifier::new(notifier_config, ring.clone());
        Self {
            config,
            llm,
            notifier,
            ring,
            http_client: reqwest::Client::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs every probe in the fixed battery plus the user-defined
    /// `patrol_rules`/`http_rules`, and when any anomaly is found, asks the
    /// LLM for a verdict and dispatches an alert. Drops the tick instead of
    /// queuing it if the previous cycle is still running.
    pub async fn perform_patrol(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.ring.append("patrol: previous cycle still running, tick dropped");
            return;
        }

        self.ring.append("正在执行系统巡检...");
        let anomalies = self.collect_anomalies().await;

        if anomalies.is_empty() {
            self.ring.append("✔ 系统健康");
        } else {
            self.dispatch_alert(&anomalies).await;
            self.ring.append(format!("发现 {} 项异常，已发送告警", anomalies.len()));
        }

        self.in_flight.store(false, Ordering::SeqCst);
    }

    async fn collect_anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        anomalies.extend(probes::probe_disk().await);
        anomalies.extend(probes::probe_load().await);
        anomalies.extend(probes::probe_oom().await);
        anomalies.extend(probes::probe_zombies().await);

        for rule in &self.config.patrol_rules {
            anomalies.extend(probes::probe_custom_rule(rule).await);
        }
        for rule in &self.config.http_rules {
            anomalies.extend(probes::probe_http_rule(rule, &self.http_client).await);
        }

        anomalies
    }

    async fn dispatch_alert(&self, anomalies: &[Anomaly]) {
        let evidence_blocks: Vec<String> =
            anomalies.iter().map(crate::report::format_evidence_block).collect();
        let analysis = analyze(&self.llm, &evidence_blocks).await;

        let host = stats::hostname().await;
        let host = stats::na_if_blank(host);
        let title = build_alert_title(&host);
        let body = build_alert_body(&host, anomalies, &analysis);
        self.notifier.send(&title, &body).await;
    }

    /// Gathers the host metrics shared with the dashboard's `/api/stats`
    /// endpoint and sends them as a markdown table.
    pub async fn send_system_status(&self) {
        let status = DailyStatus {
            host: stats::na_if_blank(stats::hostname().await),
            ip: stats::na_if_blank(stats::primary_ip().await),
            uptime: stats::na_if_blank(stats::uptime_pretty().await),
            mem_pct: stats::na_if_blank(stats::mem_pct().await),
            mem_used_mb: stats::na_if_blank(stats::mem_used_mb().await),
            mem_total_mb: stats::na_if_blank(stats::mem_total_mb().await),
            disk_pct: stats::na_if_blank(stats::disk_pct(ROOT_MOUNT).await),
            disk_avail: stats::na_if_blank(stats::disk_avail(ROOT_MOUNT).await),
            load: stats::na_if_blank(stats::load().await),
            tcp_established: stats::na_if_blank(stats::tcp_established_count().await),
        };

        let title = build_status_title(&status.host);
        let body = build_status_body(&status);
        self.notifier.send(&title, &body).await;
        self.ring.append("每日状态报告已发送");
    }

    /// The two-cadence driver: an immediate patrol on start, a status
    /// report 30 seconds later, then patrol every 5 minutes and a status
    /// report every `report_interval_hours`. Runs until `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        self.perform_patrol().await;

        let mut patrol_ticker = tokio::time::interval(std::time::Duration::from_secs(PATROL_INTERVAL_SECS));
        patrol_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        patrol_ticker.tick().await; // consume the immediate first tick

        let status_interval = std::time::Duration::from_secs(self.config.report_interval_hours * 3600);
        let mut status_ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + std::time::Duration::from_secs(STATUS_REPORT_INITIAL_DELAY_SECS),
            status_interval,
        );
        status_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = patrol_ticker.tick() => self.perform_patrol().await,
                _ = status_ticker.tick() => self.send_system_status().await,
                _ = shutdown.recv() => {
                    self.ring.append("patrol: shutdown signal received, stopping ticker");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Arc<LogRing> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(LogRing::new(dir.into_path(), "test.log"))
    }

    fn engine() -> PatrolEngine {
        PatrolEngine::new(AppConfig::default(), ring())
    }

    #[tokio::test]
    async fn overlapping_patrol_drops_second_tick() {
        let engine = Arc::new(engine());
        let first = engine.clone();
        let second = engine.clone();

        // Simulate overlap by holding the flag manually rather than racing
        // two real perform_patrol() calls against host state.
        first.in_flight.store(true, Ordering::SeqCst);
        second.perform_patrol().await;

        let snapshot = second.ring.snapshot();
        assert!(snapshot.iter().any(|e| e.text.contains("tick dropped")));
        first.in_flight.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn perform_patrol_logs_start_marker() {
        let engine = engine();
        engine.perform_patrol().await;
        let snapshot = engine.ring.snapshot();
        assert!(snapshot.iter().any(|e| e.text.contains("正在执行系统巡检")));
    }

    #[tokio::test]
    async fn status_report_logs_completion() {
        let engine = engine();
        engine.send_system_status().await;
        let snapshot = engine.ring.snapshot();
        assert!(snapshot.iter().any(|e| e.text.contains("每日状态报告已发送")));
    }
}
