use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

const NAMESPACE: &str = "marketplace";

/// Central metrics registry for the marketplace service
pub struct MetricsRegistry {
    registry: Registry,

    // HTTP Metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // OTP Metrics
    pub otp_issued_total: CounterVec,
    pub otp_verifications_total: CounterVec,
    pub email_failures_total: CounterVec,

    // Booking Metrics
    pub booking_transitions_total: CounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        // HTTP Metrics
        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests").namespace(NAMESPACE),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration")
                .namespace(NAMESPACE)
                .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        // OTP Metrics
        let otp_issued_total = CounterVec::new(
            Opts::new("otp_issued_total", "Verification codes issued").namespace(NAMESPACE),
            &["purpose"],
        )?;
        registry.register(Box::new(otp_issued_total.clone()))?;

        let otp_verifications_total = CounterVec::new(
            Opts::new("otp_verifications_total", "Verification attempts by outcome")
                .namespace(NAMESPACE),
            &["purpose", "outcome"],
        )?;
        registry.register(Box::new(otp_verifications_total.clone()))?;

        let email_failures_total = CounterVec::new(
            Opts::new("email_failures_total", "Outbound emails that failed to send")
                .namespace(NAMESPACE),
            &["purpose"],
        )?;
        registry.register(Box::new(email_failures_total.clone()))?;

        // Booking Metrics
        let booking_transitions_total = CounterVec::new(
            Opts::new("booking_transitions_total", "Booking transitions by resulting status")
                .namespace(NAMESPACE),
            &["status"],
        )?;
        registry.register(Box::new(booking_transitions_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            otp_issued_total,
            otp_verifications_total,
            email_failures_total,
            booking_transitions_total,
        }))
    }

    pub fn record_otp_issued(&self, purpose: &str) {
        self.otp_issued_total.with_label_values(&[purpose]).inc();
    }

    pub fn record_otp_verification(&self, purpose: &str, outcome: &str) {
        self.otp_verifications_total
            .with_label_values(&[purpose, outcome])
            .inc();
    }

    pub fn record_email_failure(&self, purpose: &str) {
        self.email_failures_total.with_label_values(&[purpose]).inc();
    }

    pub fn record_booking_transition(&self, status: &str) {
        self.booking_transitions_total
            .with_label_values(&[status])
            .inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
