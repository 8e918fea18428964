//! Render specifications and render job state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nested job specification sent to the rendering provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub resolution: String,
    pub quality: String,
    pub scenes: Vec<RenderScene>,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            comment: None,
            resolution: "full-hd".to_string(),
            quality: "high".to_string(),
            scenes: Vec::new(),
        }
    }
}

/// One scene of a render: a stack of timed elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderScene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub elements: Vec<RenderElement>,
}

/// A scene element referencing an external asset or carrying text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderElement {
    Image {
        src: String,
        /// Seconds; `None` lets the provider match the scene length.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    Audio {
        src: String,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
}

/// Render job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Submitted,
    InProgress,
    Done,
    Error,
    TimedOut,
}

impl RenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::Submitted => "submitted",
            RenderState::InProgress => "in_progress",
            RenderState::Done => "done",
            RenderState::Error => "error",
            RenderState::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderState::Done | RenderState::Error | RenderState::TimedOut)
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A render job issued by the provider.
///
/// Transitions are no-ops once the job is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    pub id: String,
    pub state: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Status checks made so far.
    pub polls: u32,
}

impl RenderJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: RenderState::Submitted,
            result_url: None,
            failure_reason: None,
            polls: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn start_polling(&mut self) {
        if self.state == RenderState::Submitted {
            self.state = RenderState::InProgress;
        }
    }

    pub fn complete(&mut self, url: impl Into<String>) {
        if !self.is_terminal() {
            self.state = RenderState::Done;
            self.result_url = Some(url.into());
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.is_terminal() {
            self.state = RenderState::Error;
            self.failure_reason = Some(reason.into());
        }
    }

    pub fn time_out(&mut self) {
        if !self.is_terminal() {
            self.state = RenderState::TimedOut;
            self.failure_reason = Some(format!("no terminal state after {} polls", self.polls));
        }
    }
}
