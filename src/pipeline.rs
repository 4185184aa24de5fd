use std::sync::Arc;
use std::time::Instant;

use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::extract;
use crate::fetcher::PageSource;
use crate::llm::CompletionClient;
use crate::report::{self, ReportSource, TrafficReport};
use crate::structurer;

/// Result of one pipeline run: the report plus where it came from.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: TrafficReport,
    pub source: ReportSource,
}

/// Fetch → extract → structure, with a single fallback boundary.
pub struct Pipeline {
    source: Arc<dyn PageSource>,
    llm: Arc<dyn CompletionClient>,
    max_chars: usize,
}

impl Pipeline {
    pub fn new(source: Arc<dyn PageSource>, llm: Arc<dyn CompletionClient>, max_chars: usize) -> Self {
        Self {
            source,
            llm,
            max_chars,
        }
    }

    /// Always yields a usable report: live data, or the fallback catalog.
    pub async fn run(&self) -> Outcome {
        let t0 = Instant::now();
        match self.try_run().await {
            Ok(report) => {
                info!(
                    "Live report: {} alerts, {} events, {} news in {:.1}s",
                    report.alerts.len(),
                    report.events.len(),
                    report.news.len(),
                    t0.elapsed().as_secs_f64()
                );
                Outcome {
                    report,
                    source: ReportSource::Live,
                }
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Pipeline failed, serving fallback data");
                Outcome {
                    report: report::fallback().clone(),
                    source: ReportSource::Fallback,
                }
            }
        }
    }

    async fn try_run(&self) -> Result<TrafficReport, PipelineError> {
        let task = tokio::spawn(stages(self.source.clone(), self.llm.clone(), self.max_chars));
        // Dropping the request future abandons the in-flight stages too.
        let _guard = AbortOnDrop(task.abort_handle());
        task.await?
    }
}

async fn stages(
    source: Arc<dyn PageSource>,
    llm: Arc<dyn CompletionClient>,
    max_chars: usize,
) -> Result<TrafficReport, PipelineError> {
    let page = source.fetch().await?;
    info!("Fetched {} ({} bytes at {})", page.url, page.html.len(), page.fetched_at.to_rfc3339());

    // Parsing is CPU-bound and the DOM is not Send.
    let text = tokio::task::spawn_blocking(move || extract::extract_text(&page.html, max_chars)).await?;
    info!("Extracted {} chars of page text", text.chars().count());

    let report = structurer::structure(llm.as_ref(), &text).await?;
    Ok(report)
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// ── Tests ──
