use thiserror::Error;

/// Errors raised while validating a rule catalog document before it is
/// frozen into a [`crate::RuleCatalog`].
///
/// Validation never stops at the first problem: callers collect every
/// `ValidationError` produced across the whole document and report them
/// together, so a misconfigured catalog surfaces all its mistakes in one
/// startup failure instead of one restart cycle per typo.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid rules document: {0}")]
    DocumentParse(String),

    #[error("invalid rules document: root must be a mapping")]
    RootNotAMapping,

    #[error("invalid rules document: 'rules' must be a list")]
    RulesNotAList,

    #[error("{path}: must be a mapping")]
    NotAMapping { path: String },

    #[error("{path}.name: required non-empty string")]
    MissingName { path: String },

    #[error("{path}.trigger.event_type: required non-empty string")]
    MissingTriggerEventType { path: String },

    #[error("{path}: must contain only one of 'field' or 'prior_event'")]
    AmbiguousCondition { path: String },

    #[error("{path}: must contain 'field' or 'prior_event'")]
    EmptyCondition { path: String },

    #[error("{path}.field: required non-empty string")]
    MissingField { path: String },

    #[error("{path}.field: must start with one of [\"properties.\", \"user_traits.\"]")]
    BadFieldPrefix { path: String },

    #[error("{path}.operator: must be one of [\"equals\", \"gte\"]")]
    BadOperator { path: String },

    #[error("{path}.value: required")]
    MissingValue { path: String },

    #[error("{path}.prior_event.event_type: required non-empty string")]
    MissingPriorEventType { path: String },

    #[error("{path}.prior_event.hours: required positive int")]
    BadPriorEventHours { path: String },

    #[error("{path}.action.type: must be one of [\"send\", \"alert\"]")]
    BadActionType { path: String },

    #[error("{path}.action.template_name: required non-empty string")]
    MissingTemplateName { path: String },

    #[error("{path}.action.delivery_method: must be one of [\"email\", \"sms\", \"internal\"]")]
    BadDeliveryMethod { path: String },

    #[error(
        "{path}.action.delivery_method: must be \"internal\" when action.type is \"alert\""
    )]
    AlertRequiresInternal { path: String },

    #[error("{path}.suppression.mode: must be one of [\"once_ever\", \"once_per_calendar_day\", \"none\"]")]
    BadSuppressionMode { path: String },

    #[error("duplicate rule name: {name}")]
    DuplicateName { name: String },
}

/// Errors raised while evaluating a single event against the catalog.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A `prior_event` condition's repository lookup failed.
    #[error("prior-event lookup failed: {0}")]
    Repository(String),
}
