use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::checker::{check_liveness, LivenessCheck};
use crate::config::MonitorConfig;
use crate::frame::{capture_frame, FrameSampler};
use crate::notify::{Delivery, Notifier};
use crate::playlist::{read_links, PlaylistError};

/// Terminal state of one link after a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinkOutcome {
    /// Answered 200 and produced a valid frame.
    Healthy,
    /// Status other than 200; `None` when no response was received.
    BadStatus { status: Option<u16> },
    /// Answered 200 but no valid frame could be captured.
    InvalidImage { reason: String },
}

impl LinkOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, LinkOutcome::Healthy)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub url: String,
    #[serde(flatten)]
    pub outcome: LinkOutcome,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub links: Vec<LinkReport>,
}

impl RunReport {
    pub fn healthy_count(&self) -> usize {
        self.links.iter().filter(|l| l.outcome.is_healthy()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.links.len() - self.healthy_count()
    }
}

/// Sequential checker for a list of stream links.
pub struct Monitor {
    checker: Arc<dyn LivenessCheck>,
    sampler: Arc<dyn FrameSampler>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        checker: Arc<dyn LivenessCheck>,
        sampler: Arc<dyn FrameSampler>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            checker,
            sampler,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    async fn notify(&self, message: String) {
        if let Delivery::Failed { reason } = self.notifier.send(&message).await {
            warn!(reason = %reason, "Operator was not notified");
        }
    }

    /// Liveness check, then frame capture when the link answers 200.
    pub async fn check_link(&self, url: &str) -> LinkReport {
        info!(url, "Checking link");
        let status = check_liveness(self.checker.as_ref(), self.notifier.as_ref(), url).await;

        let outcome = if status != Some(200) {
            let shown = status.map_or_else(|| "None".to_string(), |s| s.to_string());
            warn!(url, status = %shown, "Invalid status code");
            self.notify(format!("Invalid status code ({}) for {}", shown, url))
                .await;
            LinkOutcome::BadStatus { status }
        } else {
            info!(url, "Status 200");
            match capture_frame(
                self.sampler.as_ref(),
                self.notifier.as_ref(),
                url,
                &self.config.output_path,
                self.config.frame_position,
            )
            .await
            {
                Ok(_) => {
                    info!(url, "Link is reachable and a frame was captured");
                    LinkOutcome::Healthy
                }
                Err(e) => {
                    self.notify(format!(
                        "Link {} is reachable, but the image is invalid.",
                        url
                    ))
                    .await;
                    LinkOutcome::InvalidImage {
                        reason: e.to_string(),
                    }
                }
            }
        };

        LinkReport {
            url: url.to_string(),
            outcome,
            checked_at: Utc::now(),
        }
    }

    /// Check every link in order, one at a time.
    pub async fn run<S: AsRef<str>>(&self, links: &[S]) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("run", %run_id, links = links.len());

        let reports = async {
            let mut reports = Vec::with_capacity(links.len());
            for link in links {
                reports.push(self.check_link(link.as_ref()).await);
            }
            reports
        }
        .instrument(span)
        .await;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            links: reports,
        };
        info!(
            %run_id,
            healthy = report.healthy_count(),
            failed = report.failed_count(),
            "Run complete"
        );
        report
    }

    /// Read the playlist at `path` and check its links.
    ///
    /// An unreadable playlist is the only error that aborts a run.
    pub async fn run_playlist(&self, path: &Path) -> Result<RunReport, PlaylistError> {
        let links = read_links(path)?;
        Ok(self.run(&links).await)
    }
}
