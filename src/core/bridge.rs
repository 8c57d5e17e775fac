//! The bridge loop: serial line in, telemetry message out.
//!
//! One strictly sequential loop per process: read a line, decode it,
//! convert it, format it, publish it. Every failure is handled at the stage
//! it occurs and never crosses the iteration boundary:
//!
//! - read errors back off for a fixed delay, then the loop continues
//! - empty and malformed lines are logged and skipped, no backoff
//! - publish failures drop the reading (at-most-once; the next one is
//!   seconds away)
//!
//! Nothing survives an iteration: each line's sample, temperature, and
//! payload are dropped before the next read.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::{
    decoder::{self, DecodeError},
    message::TelemetryMessage,
    serial::LineSource,
    thermistor,
};

/// Destination for formatted readings.
///
/// The production implementation is the MQTT publisher; tests substitute a
/// recording mock.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Sends one payload and waits for the transport to accept it.
    async fn publish(
        &self,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
impl TelemetrySink for thermbridge_mqtt::Publisher {
    async fn publish(
        &self,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        thermbridge_mqtt::Publisher::publish(self, payload)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}

/// The serial-to-broker bridge loop.
pub struct Bridge {
    source: Box<dyn LineSource>,
    sink: Arc<dyn TelemetrySink>,
    read_retry_delay: Duration,
}

impl Bridge {
    /// Creates a bridge over an open line source and a ready sink.
    ///
    /// `read_retry_delay` is the fixed pause after a failed serial read
    /// before the next attempt.
    pub fn new(
        source: Box<dyn LineSource>,
        sink: Arc<dyn TelemetrySink>,
        read_retry_delay: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            read_retry_delay,
        }
    }

    /// Runs the loop until the process is terminated.
    ///
    /// The cadence is whatever rate the sensor produces lines; there is no
    /// periodic timer beyond the read-error backoff.
    pub async fn run(mut self) -> ! {
        info!(
            "Bridge loop started (read retry delay: {}s)",
            self.read_retry_delay.as_secs()
        );

        loop {
            let line = match self.source.next_line().await {
                Ok(line) => line,
                Err(e) => {
                    error!("Serial port read error: {}", e);
                    tokio::time::sleep(self.read_retry_delay).await;
                    continue;
                }
            };

            let sample = match decoder::decode(&line) {
                Ok(sample) => sample,
                Err(DecodeError::EmptyLine) => {
                    debug!("Empty line received from serial port");
                    continue;
                }
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            let temperature = thermistor::convert(sample);
            let payload = TelemetryMessage::new(sample, temperature).to_string();

            match self.sink.publish(&payload).await {
                Ok(()) => info!("Published to MQTT: {}", payload),
                Err(e) => error!("Publish failed, reading dropped: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use tokio::time::sleep;
    use tracing_test::traced_test;

    use super::*;
    use crate::core::thermistor::convert;

    /// Replays a script of read outcomes, then blocks forever like an idle
    /// serial port.
    struct ScriptedSource {
        script: VecDeque<io::Result<String>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<io::Result<String>>) -> Box<Self> {
            Box::new(Self {
                script: script.into(),
            })
        }
    }

    #[async_trait]
    impl LineSource for ScriptedSource {
        async fn next_line(&mut self) -> io::Result<String> {
            match self.script.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Default)]
    struct MockSink {
        published: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        failures_remaining: AtomicUsize,
    }

    impl MockSink {
        fn failing_first(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures_remaining: AtomicUsize::new(failures),
                ..Default::default()
            })
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetrySink for MockSink {
        async fn publish(
            &self,
            payload: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let failing = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err("broker unavailable".into());
            }

            self.published.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    fn read_error() -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "device stalled"))
    }

    #[tokio::test]
    async fn valid_line_publishes_exact_payload() {
        let source = ScriptedSource::new(vec![Ok("30000\n".to_string())]);
        let sink = Arc::new(MockSink::default());
        let bridge = Bridge::new(source, sink.clone(), Duration::from_millis(10));

        let handle = tokio::spawn(async move {
            bridge.run().await;
        });
        sleep(Duration::from_millis(100)).await;

        let temperature = convert(30_000);
        let expected = format!(
            "ADC: 30000, Temp: {:.2}°C / {:.2}°F",
            temperature.celsius, temperature.fahrenheit
        );
        assert_eq!(sink.published(), vec![expected]);

        // The loop is awaiting the next line, not replaying state.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.attempts(), 1);

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_and_empty_lines_are_skipped() {
        let source = ScriptedSource::new(vec![
            Ok("abc\n".to_string()),
            Ok("\n".to_string()),
            Ok("   \n".to_string()),
            Ok("12ab\n".to_string()),
            Ok("42\n".to_string()),
        ]);
        let sink = Arc::new(MockSink::default());
        let bridge = Bridge::new(source, sink.clone(), Duration::from_millis(10));

        let handle = tokio::spawn(async move {
            bridge.run().await;
        });
        sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.attempts(), 1);
        assert!(sink.published()[0].starts_with("ADC: 42,"));
        assert!(logs_contain("invalid ADC value 'abc'"));
        assert!(logs_contain("invalid ADC value '12ab'"));

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn read_error_backs_off_then_recovers() {
        let source = ScriptedSource::new(vec![read_error(), Ok("100\n".to_string())]);
        let sink = Arc::new(MockSink::default());
        let delay = Duration::from_millis(300);
        let bridge = Bridge::new(source, sink.clone(), delay);

        let started = Instant::now();
        let handle = tokio::spawn(async move {
            bridge.run().await;
        });

        // During the backoff window nothing has been published.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.attempts(), 0);

        // After the backoff the valid line goes through exactly once.
        sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.published().len(), 1);
        assert!(started.elapsed() >= delay);
        assert!(logs_contain("Serial port read error"));

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn publish_failure_drops_reading_and_continues() {
        let source = ScriptedSource::new(vec![Ok("1\n".to_string()), Ok("2\n".to_string())]);
        let sink = MockSink::failing_first(1);
        let bridge = Bridge::new(source, sink.clone(), Duration::from_millis(10));

        let handle = tokio::spawn(async move {
            bridge.run().await;
        });
        sleep(Duration::from_millis(100)).await;

        // Both readings were attempted; only the second survived.
        assert_eq!(sink.attempts(), 2);
        let published = sink.published();
        assert_eq!(published.len(), 1);
        assert!(published[0].starts_with("ADC: 2,"));
        assert!(logs_contain("Publish failed, reading dropped"));

        handle.abort();
    }

    #[tokio::test]
    async fn degenerate_reading_is_still_published() {
        let source = ScriptedSource::new(vec![Ok("0\n".to_string())]);
        let sink = Arc::new(MockSink::default());
        let bridge = Bridge::new(source, sink.clone(), Duration::from_millis(10));

        let handle = tokio::spawn(async move {
            bridge.run().await;
        });
        sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.published(), vec!["ADC: 0, Temp: NaN°C / NaN°F".to_string()]);

        handle.abort();
    }
}
