//! Messages of the telemetry envelope sent in the `X-CONFIDENCE-TELEMETRY` header.
#![allow(missing_docs)]

use prost::{Enumeration, Message};

/// Envelope attached to a resolve request.
#[derive(Clone, PartialEq, Message)]
pub struct Monitoring {
    #[prost(message, repeated, tag = "1")]
    pub library_traces: Vec<LibraryTraces>,
    #[prost(enumeration = "Platform", tag = "2")]
    pub platform: i32,
}

/// Traces collected by one library.
#[derive(Clone, PartialEq, Message)]
pub struct LibraryTraces {
    #[prost(enumeration = "Library", tag = "1")]
    pub library: i32,
    #[prost(string, tag = "2")]
    pub library_version: String,
    #[prost(message, repeated, tag = "3")]
    pub traces: Vec<Trace>,
}

/// A single measurement.
#[derive(Clone, PartialEq, Message)]
pub struct Trace {
    #[prost(enumeration = "TraceId", tag = "1")]
    pub id: i32,
    #[prost(oneof = "trace::Kind", tags = "3")]
    pub kind: Option<trace::Kind>,
}

/// Nested types of [`Trace`].
pub mod trace {
    use prost::{Enumeration, Message, Oneof};

    /// Payload of a [`Trace`](super::Trace).
    #[derive(Clone, PartialEq, Oneof)]
    pub enum Kind {
        /// Latency of a request.
        #[prost(message, tag = "3")]
        RequestTrace(RequestTrace),
    }

    /// Duration and outcome of a request.
    #[derive(Clone, PartialEq, Message)]
    pub struct RequestTrace {
        #[prost(uint64, tag = "1")]
        pub millisecond_duration: u64,
        #[prost(enumeration = "RequestStatus", tag = "2")]
        pub status: i32,
    }

    /// Outcome of a request.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enumeration)]
    #[repr(i32)]
    pub enum RequestStatus {
        Unspecified = 0,
        Success = 1,
        Error = 2,
        Timeout = 3,
    }
}

/// What a [`Trace`] measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enumeration)]
#[repr(i32)]
pub enum TraceId {
    Unspecified = 0,
    ResolveLatency = 1,
}

/// Library that collected a set of traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enumeration)]
#[repr(i32)]
pub enum Library {
    Unspecified = 0,
    Confidence = 1,
    OpenFeature = 2,
}

/// Platform the SDK runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enumeration)]
#[repr(i32)]
pub enum Platform {
    Unspecified = 0,
    Java = 1,
    Kotlin = 2,
    Swift = 3,
    JsWeb = 4,
    JsServer = 5,
    Python = 6,
    Go = 7,
    Ruby = 8,
    Rust = 9,
}
