//! SRT session over GStreamer's srtsink
//!
//! A private `appsrc ! srtsink` pipeline, separate from the capture
//! pipeline, carries the packetized transport stream. Telemetry comes from
//! the sink's `stats` structure; the send-buffer reading is the appsrc
//! queue depth, the closest occupancy figure the sink exposes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;

use srt_link::{
    ConnectError, ConnectParams, Connector, LinkError, LinkStats, PacketSink, Session, Telemetry,
};

pub struct GstSrtConnector;

#[async_trait]
impl Connector for GstSrtConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn Session>, ConnectError> {
        // Resolve up front so address problems are reported as such instead
        // of surfacing as an opaque sink error
        let target = format!("{}:{}", params.host, params.port);
        let mut addrs = tokio::net::lookup_host(&target)
            .await
            .map_err(|err| ConnectError::AddressResolution(err.to_string()))?;
        if addrs.next().is_none() {
            return Err(ConnectError::AddressResolution(target));
        }

        let session = GstSrtSession::connect(params)?;
        tracing::info!(
            host = %params.host,
            port = params.port,
            latency_ms = params.latency_ms,
            "SRT connected"
        );
        Ok(Arc::new(session))
    }
}

pub struct GstSrtSession {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    srtsink: gst::Element,
    pkt_size: usize,
    closed: AtomicBool,
}

impl GstSrtSession {
    fn connect(params: &ConnectParams) -> Result<Self, ConnectError> {
        let uri = format!("srt://{}:{}?mode=caller", params.host, params.port);

        let appsrc = gst::ElementFactory::make("appsrc")
            .name("srtfeed")
            .build()
            .map_err(|err| ConnectError::SocketCreate(err.to_string()))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| ConnectError::Other("appsrc element has an unexpected type".into()))?;
        appsrc.set_is_live(true);
        appsrc.set_format(gst::Format::Bytes);
        appsrc.set_block(true);
        // Bound the queue so congestion shows up as occupancy, not memory
        appsrc.set_max_bytes((params.pkt_size * 256) as u64);

        let mut builder = gst::ElementFactory::make("srtsink")
            .name("srtout")
            .property("uri", uri.as_str())
            .property("latency", params.latency_ms as i32)
            .property("wait-for-connection", true);
        if let Some(stream_id) = &params.stream_id {
            builder = builder.property("streamid", stream_id.as_str());
        }
        let srtsink = builder
            .build()
            .map_err(|err| ConnectError::SocketCreate(err.to_string()))?;

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many([appsrc.upcast_ref(), &srtsink])
            .map_err(|err| ConnectError::Other(err.to_string()))?;
        gst::Element::link_many([appsrc.upcast_ref(), &srtsink])
            .map_err(|err| ConnectError::Other(err.to_string()))?;

        if pipeline.set_state(gst::State::Playing).is_err() {
            let reason = drain_error(&pipeline);
            let _ = pipeline.set_state(gst::State::Null);
            return Err(categorize(reason));
        }

        // Wait for the caller handshake to settle
        let (result, _, _) = pipeline.state(gst::ClockTime::from_seconds(5));
        if result.is_err() {
            let reason = drain_error(&pipeline);
            let _ = pipeline.set_state(gst::State::Null);
            return Err(categorize(reason));
        }

        Ok(Self {
            pipeline,
            appsrc,
            srtsink,
            pkt_size: params.pkt_size,
            closed: AtomicBool::new(false),
        })
    }
}

impl Telemetry for GstSrtSession {
    fn stats(&self) -> Result<LinkStats, LinkError> {
        let value = self.srtsink.property_value("stats");
        let stats = value
            .get::<gst::Structure>()
            .map_err(|err| LinkError::Stats(err.to_string()))?;

        Ok(LinkStats {
            rtt_ms: get_f64(&stats, "rtt-ms")?,
            send_rate_mbps: get_f64(&stats, "send-rate-mbps")?,
            pkt_loss_total: get_i64(&stats, "packets-sent-lost")?,
            pkt_retrans_total: get_i64(&stats, "packets-retransmitted")?,
            ack_count: get_i64(&stats, "packet-ack-received")? as u64,
        })
    }

    fn buffer_size(&self) -> Result<i64, LinkError> {
        let queued = self.appsrc.current_level_bytes();
        Ok((queued / self.pkt_size as u64) as i64)
    }
}

#[async_trait]
impl PacketSink for GstSrtSession {
    async fn send(&self, pkt: &[u8]) -> Result<usize, LinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        let buffer = gst::Buffer::from_slice(pkt.to_vec());
        self.appsrc
            .push_buffer(buffer)
            .map_err(|err| LinkError::Send(format!("{err:?}")))?;
        Ok(pkt.len())
    }
}

impl Session for GstSrtSession {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.appsrc.end_of_stream();
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

impl Drop for GstSrtSession {
    fn drop(&mut self) {
        self.close();
    }
}

// The stats structure mixes integer widths across GStreamer versions
fn get_f64(s: &gst::Structure, name: &str) -> Result<f64, LinkError> {
    s.get::<f64>(name)
        .or_else(|_| s.get::<i32>(name).map(f64::from))
        .or_else(|_| s.get::<i64>(name).map(|v| v as f64))
        .map_err(|_| LinkError::Stats(format!("no {name} in the stats structure")))
}

fn get_i64(s: &gst::Structure, name: &str) -> Result<i64, LinkError> {
    s.get::<i64>(name)
        .or_else(|_| s.get::<i32>(name).map(i64::from))
        .or_else(|_| s.get::<u64>(name).map(|v| v as i64))
        .map_err(|_| LinkError::Stats(format!("no {name} in the stats structure")))
}

fn drain_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    while let Some(msg) = bus.pop() {
        if let gst::MessageView::Error(err) = msg.view() {
            return Some(err.error().to_string());
        }
    }
    None
}

// Map the sink's error text onto the connect-error taxonomy
fn categorize(reason: Option<String>) -> ConnectError {
    let Some(reason) = reason else {
        return ConnectError::Timeout;
    };
    let lower = reason.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        ConnectError::Timeout
    } else if lower.contains("conflict") || lower.contains("already in use") {
        ConnectError::StreamIdConflict
    } else if lower.contains("forbidden") || lower.contains("rejected") {
        ConnectError::StreamIdForbidden
    } else if lower.contains("resolve") || lower.contains("name or service") {
        ConnectError::AddressResolution(reason)
    } else if lower.contains("option") {
        ConnectError::OptionSet(reason)
    } else {
        ConnectError::Other(reason)
    }
}
