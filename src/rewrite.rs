/// Artifact rewriter/extractor: turns "display the chart" into "persist the
/// chart", and collects what the worker persisted.
///
/// The rewrite replaces every `plt.show()` occurrence with a call to the
/// harness-defined flush helper. A plain call expression survives any
/// indentation context the display call appears in, so the substitution is
/// purely textual and changes no other semantics of the submitted source.
use crate::types::{Artifact, Result};
use std::path::Path;

/// The display call recognized in submitted sources
pub const SHOW_CALL: &str = "plt.show()";

/// The flush helper the harness seeds into the execution namespace
pub const FLUSH_CALL: &str = "_plotbox_flush()";

/// Artifact file name prefix and extension; files not matching the
/// `plot_NNN.png` convention are ignored by collection
pub const ARTIFACT_PREFIX: &str = "plot_";
pub const ARTIFACT_EXT: &str = ".png";

/// Replace every display call with a flush call. If the source never calls
/// `plt.show()`, it is returned unchanged and the run yields zero artifacts.
pub fn rewrite(source: &str) -> String {
    source.replace(SHOW_CALL, FLUSH_CALL)
}

/// Format the artifact name for a sequence number (zero-padded so the
/// lexical and numeric orders agree for typical counts)
pub fn artifact_name(sequence: u32) -> String {
    format!("{}{:03}{}", ARTIFACT_PREFIX, sequence, ARTIFACT_EXT)
}

/// Parse the sequence number out of a file name following the naming
/// convention; `None` for anything else
fn parse_sequence(name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_EXT)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Collect every artifact in the workspace, ordered by embedded sequence
/// number. Empty files are dropped: a zero-byte image means the worker died
/// mid-write and the blob is not a valid chart. Artifact bytes are read back
/// here because the workspace is removed right after execution.
pub fn collect(workspace_dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for entry in std::fs::read_dir(workspace_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(sequence) = parse_sequence(name) else {
            continue;
        };

        let data = std::fs::read(entry.path())?;
        if data.is_empty() {
            log::warn!("Dropping empty artifact {}", entry.path().display());
            continue;
        }

        artifacts.push(Artifact {
            name: name.to_string(),
            sequence,
            data,
        });
    }

    artifacts.sort_by_key(|a| a.sequence);
    Ok(artifacts)
}
