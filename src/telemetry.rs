//! Resolve latency telemetry.
//!
//! Every resolve request records one [`Trace`]. Traces are buffered and sent along with the next
//! resolve request in the `X-CONFIDENCE-TELEMETRY` header, as a base64-encoded [`proto::Monitoring`]
//! message. A trace is sent at most once.
use std::{
    sync::{
        mpsc::{sync_channel, Receiver, SyncSender},
        Mutex,
    },
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use prost::Message;

use crate::SDK_VERSION;

pub mod proto;

/// Name of the header carrying the telemetry envelope.
pub const TELEMETRY_HEADER: &str = "X-CONFIDENCE-TELEMETRY";

/// Maximum number of traces held between two resolve requests.
pub const TRACE_BUFFER_CAPACITY: usize = 1000;

/// Outcome of a resolve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceStatus {
    /// A response was received and decoded.
    Success,
    /// The request failed.
    Error,
    /// The request timed out.
    Timeout,
}

/// Latency of a single resolve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    /// Wall-clock duration of the request in milliseconds.
    pub duration_ms: u64,
    /// Outcome of the request.
    pub status: TraceStatus,
}

impl Trace {
    pub(crate) fn resolve_latency(elapsed: Duration, status: TraceStatus) -> Trace {
        Trace {
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status,
        }
    }
}

impl From<TraceStatus> for proto::trace::RequestStatus {
    fn from(value: TraceStatus) -> Self {
        match value {
            TraceStatus::Success => proto::trace::RequestStatus::Success,
            TraceStatus::Error => proto::trace::RequestStatus::Error,
            TraceStatus::Timeout => proto::trace::RequestStatus::Timeout,
        }
    }
}

impl From<Trace> for proto::Trace {
    fn from(value: Trace) -> Self {
        proto::Trace {
            id: proto::TraceId::ResolveLatency as i32,
            kind: Some(proto::trace::Kind::RequestTrace(proto::trace::RequestTrace {
                millisecond_duration: value.duration_ms,
                status: proto::trace::RequestStatus::from(value.status) as i32,
            })),
        }
    }
}

/// Bounded FIFO of traces.
///
/// Pushing never blocks: when the buffer is full the new trace is dropped. Draining takes every
/// buffered trace, so two concurrent drains never return the same trace.
pub(crate) struct TraceBuffer {
    sender: SyncSender<Trace>,
    receiver: Mutex<Receiver<Trace>>,
}

impl TraceBuffer {
    pub fn new() -> TraceBuffer {
        TraceBuffer::with_capacity(TRACE_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> TraceBuffer {
        let (sender, receiver) = sync_channel(capacity);
        TraceBuffer {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub fn push(&self, trace: Trace) {
        if let Err(err) = self.sender.try_send(trace) {
            log::debug!(target: "confidence", "dropping resolve latency trace: {err}");
        }
    }

    pub fn drain(&self) -> Vec<Trace> {
        let receiver = self
            .receiver
            .lock()
            .expect("thread holding trace buffer lock should not panic");
        receiver.try_iter().collect()
    }
}

/// Build the envelope for `traces`.
pub fn monitoring(traces: Vec<Trace>) -> proto::Monitoring {
    proto::Monitoring {
        platform: proto::Platform::Rust as i32,
        library_traces: vec![proto::LibraryTraces {
            library: proto::Library::Confidence as i32,
            library_version: SDK_VERSION.to_owned(),
            traces: traces.into_iter().map(proto::Trace::from).collect(),
        }],
    }
}

/// Encode `traces` as the value of [`TELEMETRY_HEADER`].
pub fn encode_header(traces: Vec<Trace>) -> String {
    STANDARD.encode(monitoring(traces).encode_to_vec())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use prost::Message;

    use super::{encode_header, proto, Trace, TraceBuffer, TraceStatus};

    fn trace(duration_ms: u64) -> Trace {
        Trace {
            duration_ms,
            status: TraceStatus::Success,
        }
    }

    #[test]
    fn drain_empties_buffer() {
        let buffer = TraceBuffer::new();
        buffer.push(trace(1));
        buffer.push(trace(2));

        assert_eq!(buffer.drain(), vec![trace(1), trace(2)]);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn full_buffer_drops_new_traces() {
        let buffer = TraceBuffer::with_capacity(2);
        buffer.push(trace(1));
        buffer.push(trace(2));
        buffer.push(trace(3));

        assert_eq!(buffer.drain(), vec![trace(1), trace(2)]);
    }

    #[test]
    fn concurrent_pushes_are_each_drained_once() {
        let buffer = Arc::new(TraceBuffer::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for j in 0..10 {
                        buffer.push(trace(i * 10 + j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut drained = buffer.drain();
        drained.sort_by_key(|t| t.duration_ms);
        assert_eq!(drained, (0..40).map(trace).collect::<Vec<_>>());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn resolve_latency_rounds_down_to_milliseconds() {
        let trace = Trace::resolve_latency(Duration::from_micros(12_900), TraceStatus::Timeout);
        assert_eq!(trace.duration_ms, 12);
        assert_eq!(trace.status, TraceStatus::Timeout);
    }

    #[test]
    fn header_decodes_to_monitoring_envelope() {
        let header = encode_header(vec![Trace {
            duration_ms: 42,
            status: TraceStatus::Error,
        }]);

        let monitoring =
            proto::Monitoring::decode(STANDARD.decode(header).unwrap().as_slice()).unwrap();

        assert_eq!(monitoring.platform, proto::Platform::Rust as i32);
        assert_eq!(monitoring.library_traces.len(), 1);
        let library = &monitoring.library_traces[0];
        assert_eq!(library.library, proto::Library::Confidence as i32);
        assert_eq!(library.library_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            library.traces,
            vec![proto::Trace {
                id: proto::TraceId::ResolveLatency as i32,
                kind: Some(proto::trace::Kind::RequestTrace(
                    proto::trace::RequestTrace {
                        millisecond_duration: 42,
                        status: proto::trace::RequestStatus::Error as i32,
                    }
                )),
            }]
        );
    }

    #[test]
    fn empty_header_still_carries_library() {
        let header = encode_header(vec![]);
        let monitoring =
            proto::Monitoring::decode(STANDARD.decode(header).unwrap().as_slice()).unwrap();
        assert!(monitoring.library_traces[0].traces.is_empty());
    }
}
