//! Parameter store values.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One `(name, value)` pair returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub value: String,
}

impl ParameterRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of a listing. `next_token` is `None` on the last page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub records: Vec<ParameterRecord>,
    pub next_token: Option<String>,
}

/// Storage class of a parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ParameterType {
    String,
    SecureString,
}

/// How a parameter is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Replace an existing value instead of failing.
    pub overwrite: bool,
    /// Store as [`ParameterType::SecureString`] rather than plain text.
    pub secure: bool,
    /// Key used for secure parameters; provider default when `None`.
    pub key_id: Option<String>,
}

impl PutOptions {
    /// Options matching the `--insecure`, `--kms-key-id` and `--overwrite` flags.
    pub fn from_flags(insecure: bool, key_id: Option<String>, overwrite: bool) -> Self {
        Self {
            overwrite,
            secure: !insecure,
            key_id: key_id.filter(|k| !k.is_empty()),
        }
    }

    pub fn parameter_type(&self) -> ParameterType {
        if self.secure {
            ParameterType::SecureString
        } else {
            ParameterType::String
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_options_from_flags() {
        let opts = PutOptions::from_flags(false, Some("alias/consul".into()), true);
        assert_eq!(opts.parameter_type(), ParameterType::SecureString);
        assert_eq!(opts.key_id.as_deref(), Some("alias/consul"));
        assert!(opts.overwrite);

        let insecure = PutOptions::from_flags(true, Some(String::new()), false);
        assert_eq!(insecure.parameter_type(), ParameterType::String);
        assert_eq!(insecure.key_id, None);
        assert!(!insecure.overwrite);
    }

    #[test]
    fn test_parameter_type_strings() {
        assert_eq!(ParameterType::SecureString.as_ref(), "SecureString");
        assert_eq!("String".parse::<ParameterType>().unwrap(), ParameterType::String);
    }
}
