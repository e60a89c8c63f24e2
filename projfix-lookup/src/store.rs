use crate::error::LookupError;
use crate::files::{PROJECT_PATTERN, find_project_files};
use crate::reference::{extract_hint_paths, identity};
use camino::Utf8Path;
use fs_err as fs;
use projfix_xml::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Locates the package-relative part of a NuGet-style hint path:
/// `...\packages\<package>\lib\...\Name.dll`. Group 1 is everything from `\lib\` on.
pub const PACKAGE_LIB_PATTERN: &str = r"^(?:.*\\packages\\\S+)(\\lib\\.*\.dll)";

/// Replacement for the matched prefix; `{package}` becomes the mangled package name.
pub const PACKAGE_VAR_TEMPLATE: &str = "$(Pkg{package})";

static PACKAGE_LIB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PACKAGE_LIB_PATTERN).expect("package lib pattern is valid"));

/// Reference name → hint path, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupStore {
    entries: BTreeMap<String, String>,
}

impl LookupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from every project file under `root`.
    ///
    /// Files are visited in sorted path order and a key seen twice keeps the value from the
    /// later file. Files that cannot be read or parsed are logged and skipped.
    pub fn aggregate(root: &Utf8Path) -> Result<Self, LookupError> {
        let mut store = Self::new();
        for path in find_project_files(root, PROJECT_PATTERN)? {
            debug!(path = %path, "found project file");
            match Self::extract_from_file(&path) {
                Ok(found) => {
                    for (name, hint) in found {
                        if let Some(previous) = store.entries.insert(name.clone(), hint) {
                            debug!(reference = %name, %previous, "hint path overwritten by {path}");
                        }
                    }
                }
                Err(e) => warn!(path = %path, "skipping project file: {e}"),
            }
        }
        info!(entries = store.len(), "aggregated reference lookup");
        Ok(store)
    }

    /// Hint paths declared in one project file.
    pub fn extract_from_file(path: &Utf8Path) -> Result<BTreeMap<String, String>, LookupError> {
        let doc = Document::open(path)?;
        Ok(extract_hint_paths(&doc))
    }

    /// Read a persisted store. Anything other than a flat object of strings is a format error.
    pub fn load(path: &Utf8Path) -> Result<Self, LookupError> {
        let contents = fs::read_to_string(path)?;
        let store = Self::from_json(&contents, path.as_str())?;
        debug!(path = %path, entries = store.len(), "loaded reference lookup");
        Ok(store)
    }

    pub fn from_json(json: &str, origin: &str) -> Result<Self, LookupError> {
        serde_json::from_str(json).map_err(|e| LookupError::Format {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Sorted keys, two-space indent.
    pub fn to_json(&self) -> String {
        // A map of strings always serializes.
        serde_json::to_string_pretty(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn persist(&self, path: &Utf8Path) -> Result<(), LookupError> {
        fs::write(path, self.to_json())?;
        info!(path = %path, entries = self.len(), "wrote reference lookup");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Rewrite every path `rule` matches and drop the entries it does not.
    ///
    /// The result's keys are always a subset of this store's keys.
    pub fn remap_path_pattern(&self, rule: &RemapRule) -> Self {
        let mut out = Self::new();
        for (name, path) in &self.entries {
            match rule.apply(name, path) {
                Some(new_path) => {
                    debug!(reference = %name, "remapped to {new_path}");
                    out.entries.insert(name.clone(), new_path);
                }
                None => debug!(reference = %name, "no package match for {path}, dropped"),
            }
        }
        out
    }
}

impl FromIterator<(String, String)> for LookupStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A path pattern plus the template that replaces its matched prefix.
#[derive(Debug, Clone)]
pub struct RemapRule {
    pattern: Regex,
    template: String,
}

impl RemapRule {
    /// `pattern` must match from the start of the path; its first group is kept after the
    /// replacement. `template` may use `{package}`.
    pub fn new(pattern: &str, template: &str) -> Result<Self, LookupError> {
        let pattern = Regex::new(pattern).map_err(|e| LookupError::Pattern {
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            template: template.to_string(),
        })
    }

    /// `...\packages\<pkg>\lib\...` → `$(Pkg<pkg>)\lib\...`
    pub fn package_lib() -> Self {
        Self {
            pattern: PACKAGE_LIB_RE.clone(),
            template: PACKAGE_VAR_TEMPLATE.to_string(),
        }
    }

    /// The remapped path for reference `name`, or `None` if `path` does not match.
    pub fn apply(&self, name: &str, path: &str) -> Option<String> {
        let caps = self.pattern.captures(path)?;
        let whole = caps.get(0)?;
        let kept = caps.get(1).map_or("", |m| m.as_str());
        let replacement = self.template.replace("{package}", &mangle(identity(name)));
        Some(format!(
            "{}{}{}{}",
            &path[..whole.start()],
            replacement,
            kept,
            &path[whole.end()..]
        ))
    }
}

impl Default for RemapRule {
    fn default() -> Self {
        Self::package_lib()
    }
}

/// Package names become build-variable suffixes: dots and spaces turn into underscores.
fn mangle(package: &str) -> String {
    package.replace(['.', ' '], "_")
}
