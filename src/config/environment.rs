//! Deployment environment names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment the service runs in. Selects the logging preset only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Sandbox,
    Integration,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Sandbox => "sandbox",
            Environment::Integration => "integration",
            Environment::Production => "production",
        }
    }

    /// Parse leniently: case-insensitive, empty means development, anything
    /// unrecognised is treated as production.
    pub fn parse_lenient(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Environment::Development;
        }
        value.parse().unwrap_or(Environment::Production)
    }

    /// Development and test run with verbose, human-readable logs.
    pub fn is_debug(&self) -> bool {
        matches!(self, Environment::Development | Environment::Test)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "sandbox" => Ok(Environment::Sandbox),
            "integration" => Ok(Environment::Integration),
            "production" => Ok(Environment::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(Environment::parse_lenient("PRODUCTION"), Environment::Production);
    }

    #[test]
    fn lenient_parse_defaults() {
        assert_eq!(Environment::parse_lenient(""), Environment::Development);
        assert_eq!(Environment::parse_lenient("qa"), Environment::Production);
    }
}
