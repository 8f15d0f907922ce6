//! On-screen stats overlay
//!
//! Writes one compact line per update to the pipeline's `overlay` text
//! element: published bitrate and throughput, then the RTT and buffer
//! values next to their thresholds.

use balancer::Output;
use gstreamer as gst;
use gstreamer::prelude::*;

use crate::adapters::OverlaySink;

pub struct GstOverlaySink {
    element: Option<gst::Element>,
}

impl GstOverlaySink {
    pub fn from_pipeline(pipeline: &gst::Pipeline) -> Self {
        let element = pipeline
            .by_name("overlay")
            .filter(|e| e.find_property("text").is_some());
        if element.is_none() {
            tracing::debug!("no overlay element in the pipeline");
        }
        Self { element }
    }
}

impl OverlaySink for GstOverlaySink {
    fn update(&mut self, output: &Output) {
        let Some(element) = &self.element else {
            return;
        };
        let text = format!(
            "  b: {:5}/{:5.0} rtt: {:3}/{:3}/{:3} bs: {:3}/{:3}/{:3}/{:3}",
            output.new_bitrate / 1000,
            output.throughput,
            output.rtt,
            output.rtt_th_min,
            output.rtt_th_max,
            output.bs,
            output.bs_th1,
            output.bs_th2,
            output.bs_th3,
        );
        element.set_property("text", text.as_str());
    }
}
