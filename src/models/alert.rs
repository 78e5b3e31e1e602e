use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Red,
    Orange,
    Green,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Red => "🔴",
            Severity::Orange => "🟠",
            Severity::Green => "🟢",
        }
    }

    /// Green for an upward move, orange for a downward one.
    pub fn for_move(change: f64) -> Self {
        if change > 0.0 {
            Severity::Green
        } else {
            Severity::Orange
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Market,
    #[serde(rename = "xstocks")]
    TokenizedEquity,
    Pool,
    Reward,
    Platform,
    #[serde(rename = "newpool")]
    NewPool,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Market => "market",
            AlertCategory::TokenizedEquity => "xstocks",
            AlertCategory::Pool => "pool",
            AlertCategory::Reward => "reward",
            AlertCategory::Platform => "platform",
            AlertCategory::NewPool => "newpool",
        }
    }
}

/// One actionable finding of a run. Only ever persisted inside its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "lv")]
    pub severity: Severity,
    #[serde(rename = "cat")]
    pub category: AlertCategory,
    #[serde(rename = "msg")]
    pub message: String,
}

impl Alert {
    pub fn new(severity: Severity, category: AlertCategory, message: impl Into<String>) -> Self {
        Self { severity, category, message: message.into() }
    }
}
