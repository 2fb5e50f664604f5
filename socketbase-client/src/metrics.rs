//! Client metrics definitions
//!
//! OpenTelemetry instruments describing client health. They are created
//! when observability is enabled through `ClientBuilder::with_observability`
//! and exported by whatever meter provider is installed globally.
//!
//! # Metrics Collected
//!
//! - **connection_state**: current state (gauge, see `ConnectionState::as_metric`)
//! - **frames_sent**: frames written to the transport, by frame type (counter)
//! - **frames_queued**: frames parked while disconnected, by frame type (counter)
//! - **requests_total** / **request_duration**: join/leave outcomes and latency
//! - **errors_total**: errors by kind (counter)
//! - **reconnection_attempts** / **reconnection_success**: reconnect activity
//! - **events_emitted**: events delivered to subscribers, by event (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state (0=idle, 1=connecting, 2=open, 3=closed)
    pub connection_state: Gauge<i64>,
    /// Frames written to the transport
    pub frames_sent: Counter<u64>,
    /// Frames queued while not connected
    pub frames_queued: Counter<u64>,
    /// Join/leave requests by outcome
    pub requests_total: Counter<u64>,
    /// Join/leave acknowledgement latency in seconds
    pub request_duration: Histogram<f64>,
    /// Errors by kind
    pub errors_total: Counter<u64>,
    /// Scheduled reconnection attempts
    pub reconnection_attempts: Counter<u64>,
    /// Opens that followed at least one reconnection attempt
    pub reconnection_success: Counter<u64>,
    /// Events delivered to subscribers
    pub events_emitted: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics from the global meter named after `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics from a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("socketbase.client.connection.state")
                .with_description("Connection state (0=idle, 1=connecting, 2=open, 3=closed)")
                .build(),
            frames_sent: meter
                .u64_counter("socketbase.client.frames.sent")
                .with_description("Frames written to the transport")
                .build(),
            frames_queued: meter
                .u64_counter("socketbase.client.frames.queued")
                .with_description("Frames queued while disconnected")
                .build(),
            requests_total: meter
                .u64_counter("socketbase.client.requests.total")
                .with_description("Join and leave requests by outcome")
                .build(),
            request_duration: meter
                .f64_histogram("socketbase.client.request.duration")
                .with_description("Join and leave acknowledgement latency in seconds")
                .build(),
            errors_total: meter
                .u64_counter("socketbase.client.errors.total")
                .with_description("Errors by kind")
                .build(),
            reconnection_attempts: meter
                .u64_counter("socketbase.client.reconnection.attempts")
                .with_description("Scheduled reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("socketbase.client.reconnection.success")
                .with_description("Successful reconnections")
                .build(),
            events_emitted: meter
                .u64_counter("socketbase.client.events.emitted")
                .with_description("Events delivered to subscribers")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: i64) {
        self.connection_state.record(state, &[]);
    }

    /// Record a frame written to the transport
    pub fn record_frame_sent(&self, frame_type: &str) {
        self.frames_sent
            .add(1, &[KeyValue::new("type", frame_type.to_string())]);
    }

    /// Record a frame parked in the outbound queue
    pub fn record_frame_queued(&self, frame_type: &str) {
        self.frames_queued
            .add(1, &[KeyValue::new("type", frame_type.to_string())]);
    }

    /// Record a join/leave outcome
    pub fn record_request(&self, kind: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }

    /// Record a scheduled reconnection attempt
    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    /// Record a successful reconnection
    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    /// Record an event delivered to subscribers
    pub fn record_event(&self, event: &str) {
        self.events_emitted
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        // Without a meter provider the instruments are no-ops
        let metrics = ClientMetrics::new("test-client");

        metrics.update_connection_state(2);
        metrics.record_frame_sent("message");
        metrics.record_frame_queued("join");
        metrics.record_request("join", "success", 0.05);
        metrics.record_error("parse_error");
        metrics.record_reconnection_attempt();
        metrics.record_reconnection_success();
        metrics.record_event("open");
    }

    #[test]
    fn test_request_metrics() {
        let metrics = ClientMetrics::new("test-client-req");

        metrics.record_request("join", "success", 0.02);
        metrics.record_request("leave", "error", 0.01);
        metrics.record_request("join", "timeout", 5.0);
    }
}
