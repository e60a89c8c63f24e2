use crate::error::PatchError;
use crate::patches::{Patch, PatchOutcome};
use projfix_xml::{Document, Query};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::warn;

const TARGET_FRAMEWORK_VERSION: &str = "TargetFrameworkVersion";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9.]+$").expect("framework version pattern is valid"));

/// A target framework version such as `v4.5.2`. Construction validates the format, so a
/// batch can refuse a bad value before opening any file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkVersion(String);

impl FrameworkVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FrameworkVersion {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if VERSION_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(PatchError::validation(format!(
                "framework version '{s}' must look like v4.5 (a 'v' followed by digits and dots)"
            )))
        }
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set `TargetFrameworkVersion` to a fixed value.
#[derive(Debug, Clone)]
pub struct SetFrameworkVersion {
    version: FrameworkVersion,
}

impl SetFrameworkVersion {
    pub fn new(version: FrameworkVersion) -> Self {
        Self { version }
    }
}

impl Patch for SetFrameworkVersion {
    fn id(&self) -> &'static str {
        "dotnetver"
    }

    fn apply(&self, doc: &mut Document) -> Result<PatchOutcome, PatchError> {
        let current = doc
            .find_first(&Query::descendant(TARGET_FRAMEWORK_VERSION))
            .map(|el| el.text().unwrap_or_default());

        match current {
            Some(text) if text == self.version.as_str() => Ok(PatchOutcome::default()),
            Some(_) => {
                doc.set_element_text(TARGET_FRAMEWORK_VERSION, self.version.as_str());
                Ok(PatchOutcome::edited(1))
            }
            None => {
                warn!("<{TARGET_FRAMEWORK_VERSION}> not found, version not set");
                let mut outcome = PatchOutcome::default();
                outcome.skip(format!("no <{TARGET_FRAMEWORK_VERSION}>"));
                Ok(outcome)
            }
        }
    }
}
