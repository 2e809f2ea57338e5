//! Message formatting collaborator.
//!
//! The engine never builds user-facing sentences itself: errors map to a
//! stable message key plus arguments, and a [`Language`] renders them.

use std::collections::HashMap;

/// Renders message keys into user-facing text.
pub trait Language: Send + Sync {
    /// Locale name, e.g. `"en-US"`.
    fn name(&self) -> &str;

    /// Renders `key` with positional `args`. Unknown keys must still produce
    /// some text (never panic).
    fn get(&self, key: &str, args: &[String]) -> String;
}

/// Built-in English messages.
///
/// Templates use `{0}`, `{1}`, ... placeholders. Hosts can override or add
/// keys with [`DefaultLanguage::with_message`].
pub struct DefaultLanguage {
    messages: HashMap<&'static str, String>,
}

impl DefaultLanguage {
    #[must_use]
    pub fn new() -> Self {
        let messages = [
            ("SETTING_GATEWAY_KEY_NOEXT", "The key `{0}` does not exist in the current data schema."),
            ("SETTING_GATEWAY_CHOOSE_KEY", "You cannot edit a settings folder, please choose one of the keys: `{0}`."),
            ("SETTING_GATEWAY_UNCONFIGURABLE_FOLDER", "This settings folder does not have any configurable key."),
            ("SETTING_GATEWAY_UNCONFIGURABLE_KEY", "The key `{0}` is not configurable."),
            ("SETTING_GATEWAY_INVALID_FILTERED_VALUE", "The value `{1}` is not valid for the key `{0}`."),
            ("SETTING_GATEWAY_DUPLICATE_VALUE", "The value `{0}` for the key `{1}` already exists."),
            ("SETTING_GATEWAY_MISSING_VALUE", "The value `{0}` for the key `{1}` does not exist."),
            ("RESOLVER_MINMAX_EXACTLY", "{0} must be exactly {1}."),
            ("RESOLVER_MINMAX_BOTH", "{0} must be between {1} and {2} ({3})."),
            ("RESOLVER_MINMAX_MIN", "{0} must be greater than {1} ({2})."),
            ("RESOLVER_MINMAX_MAX", "{0} must be less than {1} ({2})."),
        ]
        .into_iter()
        .map(|(key, template)| (key, template.to_owned()))
        .collect();
        Self { messages }
    }

    /// Overrides or adds a message template.
    #[must_use]
    pub fn with_message(mut self, key: &'static str, template: impl Into<String>) -> Self {
        self.messages.insert(key, template.into());
        self
    }
}

impl Default for DefaultLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl Language for DefaultLanguage {
    fn name(&self) -> &str {
        "en-US"
    }

    fn get(&self, key: &str, args: &[String]) -> String {
        let Some(template) = self.messages.get(key) else {
            return if args.is_empty() {
                key.to_owned()
            } else {
                format!("{key}: {}", args.join(", "))
            };
        };
        let mut out = template.clone();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }
}
