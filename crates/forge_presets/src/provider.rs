//! Cloud provider definitions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PresetError;

/// Cloud providers a preset can branch on.
///
/// The canonical spelling (`GCP`, `AWS`, `Azure`) is what preset files use
/// as provider-variant keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProvider {
    #[serde(rename = "GCP")]
    Gcp,
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Gcp => "GCP",
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "Azure",
        }
    }

    /// Match a canonical variant key exactly.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "GCP" => Some(CloudProvider::Gcp),
            "AWS" => Some(CloudProvider::Aws),
            "Azure" => Some(CloudProvider::Azure),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![CloudProvider::Gcp, CloudProvider::Aws, CloudProvider::Azure]
    }
}

impl FromStr for CloudProvider {
    type Err = PresetError;

    /// Case-insensitive parse, for user input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcp" => Ok(CloudProvider::Gcp),
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            _ => Err(PresetError::UnknownProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("gcp".parse::<CloudProvider>().unwrap(), CloudProvider::Gcp);
        assert_eq!("AZURE".parse::<CloudProvider>().unwrap(), CloudProvider::Azure);
        assert!("ibm".parse::<CloudProvider>().is_err());
    }

    #[test]
    fn test_variant_keys_are_exact() {
        assert_eq!(CloudProvider::from_key("AWS"), Some(CloudProvider::Aws));
        assert_eq!(CloudProvider::from_key("aws"), None);
        for provider in CloudProvider::all() {
            assert_eq!(CloudProvider::from_key(provider.as_str()), Some(provider));
        }
    }
}
