//! WebSocket frame shapes. Every frame is `{"event": <name>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use cognicode_core::{AnalysisReport, FunctionInfo, Issue, Language, Ranked, Suggestion, TestCase};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    AnalyzeCode(AnalyzeRequest),
    GenerateRefactoring(RefactorRequest),
    GenerateTests(TestsRequest),
    Disconnect,
}

impl ClientMessage {
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::AnalyzeCode(_) => "analyze_code",
            ClientMessage::GenerateRefactoring(_) => "generate_refactoring",
            ClientMessage::GenerateTests(_) => "generate_tests",
            ClientMessage::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefactorRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Language,
    /// Issues from an earlier analysis; only the fixable lint issues are used.
    #[serde(default, alias = "issues")]
    pub analysis: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestsRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected(Connected),
    AnalysisProgress(Progress),
    AnalysisComplete(AnalysisReport),
    RefactorSuggestions(Vec<Ranked<Suggestion>>),
    TestCasesGenerated(Vec<Ranked<TestCase>>),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        ServerEvent::AnalysisProgress(Progress {
            progress: progress.min(100),
            message: message.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Progress events are the only non-terminal events a request emits.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ServerEvent::AnalysisProgress(_) | ServerEvent::Connected(_)
        )
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub session_id: String,
    pub server_time: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub progress: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}
