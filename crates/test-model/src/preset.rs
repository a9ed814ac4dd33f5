use serde::{Deserialize, Serialize};

/// A scripted reply for one completion request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// A full single-shot message text.
    #[serde(rename = "completed")]
    Completed(String),
    /// A sequence of streamed text fragments.
    #[serde(rename = "fragments")]
    Fragments(Vec<String>),
    /// A gateway failure, optionally carrying an upstream status.
    #[serde(rename = "failure")]
    Failure {
        status: Option<u16>,
        message: String,
    },
}

impl PresetReply {
    /// Creates a failure reply that looks like an upstream HTTP error.
    #[inline]
    pub fn upstream_failure(status: u16, message: impl Into<String>) -> Self {
        Self::Failure {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let replies = vec![
            PresetReply::Completed("1. Book a venue".to_string()),
            PresetReply::Fragments(vec![
                "Hel".to_string(),
                "lo".to_string(),
            ]),
            PresetReply::upstream_failure(500, "model overloaded"),
        ];

        let serialized = serde_json::to_string(&replies).unwrap();
        let deserialized: Vec<PresetReply> =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(replies, deserialized);
    }
}
