//! One-time code delivery
//!
//! Mail delivery is outside this service; the default sink logs the code
//! so a developer can complete a login locally.

use std::sync::Mutex;
use tracing::info;

/// Delivers a freshly generated one-time code to its recipient
pub trait OtpSink: Send + Sync {
    fn deliver(&self, email: &str, code: &str) -> cca_common::Result<()>;
}

/// Writes codes to the log
#[derive(Debug, Default)]
pub struct LogOtpSink;

impl OtpSink for LogOtpSink {
    fn deliver(&self, email: &str, code: &str) -> cca_common::Result<()> {
        info!(email = %email, code = %code, "One-time code issued");
        Ok(())
    }
}

/// Keeps delivered codes in memory; used by tests and local tooling
#[derive(Debug, Default)]
pub struct MemoryOtpSink {
    delivered: Mutex<Vec<(String, String)>>,
}

impl MemoryOtpSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code delivered to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        let delivered = self.delivered.lock().ok()?;
        delivered
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().map(|d| d.len()).unwrap_or(0)
    }
}

impl OtpSink for MemoryOtpSink {
    fn deliver(&self, email: &str, code: &str) -> cca_common::Result<()> {
        let mut delivered = self
            .delivered
            .lock()
            .map_err(|_| cca_common::Error::Internal("OTP sink lock poisoned".to_string()))?;
        delivered.push((email.to_string(), code.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_returns_latest_code() {
        let sink = MemoryOtpSink::new();
        sink.deliver("a@x.io", "111111").unwrap();
        sink.deliver("b@x.io", "222222").unwrap();
        sink.deliver("a@x.io", "333333").unwrap();
        assert_eq!(sink.last_code_for("a@x.io").as_deref(), Some("333333"));
        assert_eq!(sink.last_code_for("c@x.io"), None);
        assert_eq!(sink.delivered_count(), 3);
    }
}
