//! Prompt construction.

use std::fmt;

/// Instruction template; `{message}` is replaced with the user's text verbatim.
pub const PROMPT_TEMPLATE: &str = "Generate a suitable SQL query for the following request: '{message}'. \
Please ensure the table name matches the user's request accurately.";

/// Prompt sent to the completion endpoint for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Build the prompt for a user message.
    ///
    /// The message is embedded as-is: no escaping, trimming, or truncation.
    pub fn for_message(message: &str) -> Self {
        Self(PROMPT_TEMPLATE.replacen("{message}", message, 1))
    }

    /// Prompt text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_prompt_text() {
        let prompt = Prompt::for_message("show all sensors");
        assert_eq!(
            prompt.as_str(),
            "Generate a suitable SQL query for the following request: 'show all sensors'. \
             Please ensure the table name matches the user's request accurately."
        );
    }

    #[test]
    fn test_placeholder_in_message_is_not_expanded() {
        let prompt = Prompt::for_message("rows where note = '{message}'");
        assert!(prompt.as_str().contains("rows where note = '{message}'"));
    }

    proptest! {
        #[test]
        fn prop_prompt_contains_message_verbatim(message in any::<String>()) {
            let prompt = Prompt::for_message(&message);
            prop_assert!(prompt.as_str().contains(&message));
        }
    }
}
