use crate::error::PatchError;
use crate::patches::Patch;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use projfix_lookup::find_project_files;
use projfix_xml::Document;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Run every patch in memory and write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Changed,
    Unchanged,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub edits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_bytes: Option<u64>,
}

impl FileResult {
    fn new(path: &Utf8Path, status: FileStatus) -> Self {
        Self {
            path: path.to_string(),
            status,
            message: None,
            skipped: Vec::new(),
            edits: 0,
            before_sha256: None,
            after_sha256: None,
            before_bytes: None,
            after_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub files: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Per-file results of one patch over one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub patch: String,
    pub root: String,
    pub pattern: String,
    pub dry_run: bool,
    pub files: Vec<FileResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    fn new(patch: &str, root: &Utf8Path, pattern: &str, dry_run: bool) -> Self {
        Self {
            patch: patch.to_string(),
            root: root.to_string(),
            pattern: pattern.to_string(),
            dry_run,
            files: Vec::new(),
            summary: BatchSummary::default(),
        }
    }

    fn push(&mut self, result: FileResult) {
        self.summary.files += 1;
        match result.status {
            FileStatus::Changed => self.summary.changed += 1,
            FileStatus::Unchanged => self.summary.unchanged += 1,
            FileStatus::Failed => self.summary.failed += 1,
        }
        self.files.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// Apply `patch` to every file under `root` whose name matches `pattern`, usually
/// [`Patch::file_pattern`].
///
/// Each file is opened, patched and, if the patch made edits, written back through the same
/// handle; the handle is released before the next file. A file that fails to parse or patch
/// is recorded as failed and the batch moves on. Returns the report and a unified diff of
/// every change (written or, with `dry_run`, not).
pub fn apply_to_all(
    root: &Utf8Path,
    pattern: &str,
    patch: &dyn Patch,
    opts: &BatchOptions,
) -> Result<(BatchReport, String), PatchError> {
    let files = find_project_files(root, pattern)?;
    info!(
        patch = patch.id(),
        files = files.len(),
        dry_run = opts.dry_run,
        "applying patch"
    );

    let mut report = BatchReport::new(patch.id(), root, pattern, opts.dry_run);
    let mut before: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();
    let mut after: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();

    for path in files {
        let result = match apply_one(&path, patch, opts) {
            Ok((result, change)) => {
                if let Some((old, new)) = change {
                    let rel = relative(root, &path);
                    before.insert(rel.clone(), old);
                    after.insert(rel, new);
                }
                result
            }
            Err(e) => {
                warn!(path = %path, patch = patch.id(), "failed: {e}");
                let mut result = FileResult::new(&path, FileStatus::Failed);
                result.message = Some(e.to_string());
                result
            }
        };
        report.push(result);
    }

    info!(
        patch = patch.id(),
        changed = report.summary.changed,
        unchanged = report.summary.unchanged,
        failed = report.summary.failed,
        "patch finished"
    );
    Ok((report, render_patch(&before, &after)))
}

type Change = Option<(String, String)>;

fn apply_one(
    path: &Utf8Path,
    patch: &dyn Patch,
    opts: &BatchOptions,
) -> Result<(FileResult, Change), PatchError> {
    let mut doc = Document::open(path)?;
    let outcome = patch.apply(&mut doc)?;
    for note in &outcome.skipped {
        debug!(path = %path, "skipped {note}");
    }

    if !outcome.changed() {
        info!(path = %path, "unchanged");
        let mut result = FileResult::new(path, FileStatus::Unchanged);
        result.skipped = outcome.skipped;
        return Ok((result, None));
    }

    let old = doc.original_text().to_string();
    let new = doc.to_xml_string();
    if opts.dry_run {
        info!(path = %path, edits = outcome.edits, "would change (dry run)");
    } else {
        doc.write_back()?;
        info!(path = %path, edits = outcome.edits, "changed");
    }

    let mut result = FileResult::new(path, FileStatus::Changed);
    result.edits = outcome.edits;
    result.skipped = outcome.skipped;
    result.before_sha256 = Some(sha256_hex(old.as_bytes()));
    result.after_sha256 = Some(sha256_hex(new.as_bytes()));
    result.before_bytes = Some(old.len() as u64);
    result.after_bytes = Some(new.len() as u64);
    if opts.dry_run {
        result.message = Some("dry-run: not written".to_string());
    }
    Ok((result, Some((old, new))))
}

fn relative(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let rel = path.strip_prefix(root).unwrap_or(path);
    Utf8PathBuf::from(rel.as_str().replace('\\', "/"))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Render git-style unified diffs for every path whose contents differ.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy labels the sides original/modified; use the file path instead.
        let body = body
            .replacen("--- original\n", &format!("--- a/{path}\n"), 1)
            .replacen("+++ modified\n", &format!("+++ b/{path}\n"), 1);
        out.push_str(&body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn patch_names_files_and_skips_identical() {
        let mut before = BTreeMap::new();
        let mut after = BTreeMap::new();
        before.insert(Utf8PathBuf::from("a/A.csproj"), "<A>\n  <X>1</X>\n</A>\n".to_string());
        after.insert(Utf8PathBuf::from("a/A.csproj"), "<A>\n  <X>2</X>\n</A>\n".to_string());
        before.insert(Utf8PathBuf::from("b/B.csproj"), "<B />\n".to_string());
        after.insert(Utf8PathBuf::from("b/B.csproj"), "<B />\n".to_string());

        let patch = render_patch(&before, &after);
        assert!(patch.starts_with(
            "diff --git a/a/A.csproj b/a/A.csproj\n--- a/a/A.csproj\n+++ b/a/A.csproj\n"
        ));
        assert!(patch.contains("-  <X>1</X>\n+  <X>2</X>\n"));
        assert!(!patch.contains("B.csproj"));
    }

    #[test]
    fn summary_counts_each_status() {
        let mut report = BatchReport::new("versionless", Utf8Path::new("."), "*.csproj", false);
        for status in [
            FileStatus::Changed,
            FileStatus::Failed,
            FileStatus::Unchanged,
            FileStatus::Changed,
        ] {
            report.push(FileResult::new(Utf8Path::new("x.csproj"), status));
        }
        assert_eq!(
            report.summary,
            BatchSummary {
                files: 4,
                changed: 2,
                unchanged: 1,
                failed: 1,
            }
        );
        assert!(report.has_failures());
    }
}
