//! Metrics sink for module performance broadcasts

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ElementsConfig;
use crate::protocol::FpsReport;
use crate::surface::Surface;

/// A performance rate reported by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    ProcessingFps,
    RenderingFps,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::ProcessingFps, Metric::RenderingFps];

    pub fn name(self) -> &'static str {
        match self {
            Metric::ProcessingFps => "processingFps",
            Metric::RenderingFps => "renderingFps",
        }
    }

    /// Element id of the metric label on the stock panel layout
    pub fn default_element(self) -> &'static str {
        match self {
            Metric::ProcessingFps => "fps_processing",
            Metric::RenderingFps => "fps_rendering",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a rate the way metric labels show it
pub fn format_rate(rate: f64) -> String {
    format!("{:.3}", rate)
}

struct MetricSlot {
    metric: Metric,
    container: String,
    last: Option<f64>,
}

/// Latest value of each metric plus where it is displayed
pub struct MetricsSink {
    slots: Vec<MetricSlot>,
}

impl MetricsSink {
    pub fn new(elements: &ElementsConfig) -> Self {
        let slots = Metric::ALL
            .into_iter()
            .map(|metric| MetricSlot {
                metric,
                container: elements.metric(metric),
                last: None,
            })
            .collect();
        Self { slots }
    }

    /// Apply a report, writing every present metric to the surface
    ///
    /// Metrics absent from the report keep their previous display. Returns the
    /// number of metrics updated.
    pub fn apply<S: Surface + ?Sized>(&mut self, report: &FpsReport, surface: &mut S) -> usize {
        let mut updated = 0;
        for slot in &mut self.slots {
            if let Some(rate) = report.get(slot.metric) {
                slot.last = Some(rate);
                surface.set_text(&slot.container, &format_rate(rate));
                updated += 1;
            }
        }
        debug!(updated, "MetricsSink::apply: done");
        updated
    }

    /// Most recent value of a metric, if one was ever reported
    pub fn current(&self, metric: Metric) -> Option<f64> {
        self.slots.iter().find(|s| s.metric == metric).and_then(|s| s.last)
    }
}
