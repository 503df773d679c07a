//! Adapter capabilities as seen by callers.

use crate::protocol::Capabilities;

/// Capability flags with absent entries read as `false`.
///
/// Only hints for callers: the client never refuses a request because a
/// flag is off, except `configurationDone`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DapCapabilities {
    pub supports_configuration_done_request: bool,
    pub supports_evaluate_for_hovers: bool,
    /// `setVariable` may be sent.
    pub supports_set_variable: bool,
    /// `evaluate` honours a `format` argument, which clipboard copies use.
    pub supports_value_formatting_options: bool,
    pub supports_terminate_request: bool,
}

impl DapCapabilities {
    /// Flatten the optional flags of an `initialize` response.
    pub fn from_initialize_response(caps: &Capabilities) -> Self {
        let on = |flag: Option<bool>| flag == Some(true);
        Self {
            supports_configuration_done_request: on(caps.supports_configuration_done_request),
            supports_evaluate_for_hovers: on(caps.supports_evaluate_for_hovers),
            supports_set_variable: on(caps.supports_set_variable),
            supports_value_formatting_options: on(caps.supports_value_formatting_options),
            supports_terminate_request: on(caps.supports_terminate_request),
        }
    }
}
