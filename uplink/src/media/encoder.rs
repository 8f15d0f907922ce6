//! Encoder bitrate control
//!
//! The pipeline names its encoder `venc_bps` or `venc_kbps` depending on
//! the unit of its `bps` property; the divisor conceals the difference from
//! the control loop. Pipelines without either element run at a fixed
//! encoder bitrate.

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;

use crate::adapters::EncoderControl;

pub struct GstEncoderControl {
    element: Option<gst::Element>,
    divisor: i64,
}

impl GstEncoderControl {
    pub fn from_pipeline(pipeline: &gst::Pipeline) -> Self {
        if let Some(element) = pipeline.by_name("venc_bps") {
            return Self::bind(element, 1);
        }
        if let Some(element) = pipeline.by_name("venc_kbps") {
            return Self::bind(element, 1000);
        }
        tracing::warn!(
            "no encoder element in the pipeline, dynamic bitrate control disabled"
        );
        Self {
            element: None,
            divisor: 1,
        }
    }

    fn bind(element: gst::Element, divisor: i64) -> Self {
        if element.find_property("bps").is_none() {
            tracing::warn!(
                element = %element.name(),
                "encoder element has no bps property, dynamic bitrate control disabled"
            );
            return Self {
                element: None,
                divisor,
            };
        }
        Self {
            element: Some(element),
            divisor,
        }
    }

    pub fn is_available(&self) -> bool {
        self.element.is_some()
    }
}

impl EncoderControl for GstEncoderControl {
    fn set_bitrate(&mut self, bitrate_bps: i64) {
        let Some(element) = &self.element else {
            return;
        };
        set_numeric_property(element, "bps", bitrate_bps / self.divisor);
    }
}

// Encoder elements disagree about the integer type of their bitrate
// property, so convert to whatever the pspec declares.
fn set_numeric_property(element: &gst::Element, name: &str, value: i64) {
    let Some(pspec) = element.find_property(name) else {
        return;
    };
    let ty = pspec.value_type();
    if ty == glib::Type::U32 {
        element.set_property(name, value as u32);
    } else if ty == glib::Type::I32 {
        element.set_property(name, value as i32);
    } else if ty == glib::Type::U64 {
        element.set_property(name, value as u64);
    } else if ty == glib::Type::I64 {
        element.set_property(name, value);
    } else {
        tracing::warn!(property = name, "unsupported property type {ty}");
    }
}
