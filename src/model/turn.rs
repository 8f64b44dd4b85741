use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Success,
    Error,
    Info,
}

/// What one processed player input hands back to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub status: TurnStatus,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub consequence: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_state: Option<String>,

    pub audio_url: Option<String>,
}

impl TurnResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(TurnStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(TurnStatus::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_status(TurnStatus::Info, message)
    }

    fn with_status(status: TurnStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            consequence: None,
            world_state: None,
            audio_url: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TurnStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_frontend_shape() {
        let mut resp = TurnResponse::success("The gate opens.");
        resp.consequence = Some("The gate opens".into());

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["consequence"], "The gate opens");
        assert!(json.get("world_state").is_none());
        assert!(json["audio_url"].is_null());
    }
}
