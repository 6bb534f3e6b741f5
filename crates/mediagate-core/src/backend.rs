use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Object-storage backend identity
///
/// A closed set of providers the gateway can write to. `Gcs` is the primary
/// backend; `Spaces` (DigitalOcean Spaces) is the secondary one and may be
/// absent from a deployment entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Gcs,
    Spaces,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcs" | "google" => Ok(BackendKind::Gcs),
            "spaces" | "digital" => Ok(BackendKind::Spaces),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendKind::Gcs => write!(f, "gcs"),
            BackendKind::Spaces => write!(f, "spaces"),
        }
    }
}
