use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The account the current session belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_health() {
        let json = r#"{"status": "ok", "timestamp": "2025-11-10T18:04:11.512Z"}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(health.is_ok());
        assert!(health.timestamp.is_some());

        let degraded: HealthStatus = serde_json::from_str(r#"{"status": "degraded"}"#).unwrap();
        assert!(!degraded.is_ok());
    }
}
