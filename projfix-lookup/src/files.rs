use crate::error::LookupError;
use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern, glob_with};
use tracing::debug;

/// Every C# project file.
pub const PROJECT_PATTERN: &str = "*.csproj";

/// Project files whose name mentions a test.
pub const TEST_PROJECT_PATTERN: &str = "*[tT]est*.csproj";

/// Recursively find files under `root` whose file name matches `pattern` (glob syntax).
///
/// Results are sorted by path so every run visits files in the same order.
pub fn find_project_files(root: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>, LookupError> {
    Pattern::new(pattern).map_err(|e| LookupError::Pattern {
        message: format!("{pattern}: {e}"),
    })?;

    let full = format!("{}/**/{}", Pattern::escape(root.as_str()), pattern);
    debug!(pattern = %full, "scanning for project files");

    // File-name patterns must not reach across directories.
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut out = Vec::new();
    let entries = glob_with(&full, options).map_err(|e| LookupError::Pattern {
        message: format!("{full}: {e}"),
    })?;
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        match Utf8PathBuf::from_path_buf(path) {
            Ok(p) => out.push(p),
            Err(p) => debug!(path = %p.display(), "skipping non-UTF-8 path"),
        }
    }

    out.sort();
    Ok(out)
}
