use serde::{Deserialize, Serialize};

/// The action a matched rule calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Send,
    Alert,
    /// No rule matched.
    None,
}

impl ActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Alert => "alert",
            Self::None => "none",
        }
    }
}

impl ActionType {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "send" => Some(Self::Send),
            "alert" => Some(Self::Alert),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel for a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Internal,
}

impl Channel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Internal => "internal",
        }
    }
}

impl Channel {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-template send-frequency guarantee declared by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionMode {
    OnceEver,
    OncePerCalendarDay,
    None,
}

impl SuppressionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnceEver => "once_ever",
            Self::OncePerCalendarDay => "once_per_calendar_day",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for SuppressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of running an event through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Alert,
    Suppress,
    None,
}

impl Outcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Alert => "alert",
            Self::Suppress => "suppress",
            Self::None => "none",
        }
    }
}

impl Outcome {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Self::Allow),
            "alert" => Some(Self::Alert),
            "suppress" => Some(Self::Suppress),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict produced by the rule evaluator for a single event, before the
/// suppression gate has had a chance to veto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDecision {
    pub action_type: ActionType,
    pub template_name: Option<String>,
    pub delivery_method: Option<Channel>,
    pub suppression_mode: Option<SuppressionMode>,
    pub matched_rule: Option<String>,
    pub reason: String,
}

impl RuleDecision {
    /// The `{action_type: none, reason: "No matching rule"}` decision
    /// returned when no catalog rule matches.
    #[must_use]
    pub fn no_match() -> Self {
        Self {
            action_type: ActionType::None,
            template_name: None,
            delivery_method: None,
            suppression_mode: None,
            matched_rule: None,
            reason: "No matching rule".to_owned(),
        }
    }
}
