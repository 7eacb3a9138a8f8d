//! Path materializer: writes captured resources to a directory tree that
//! mirrors their origin URLs.
//!
//! One `ResourceSaver` owns the set of paths already assigned during a run,
//! so colliding derivations (same URL path with different query strings,
//! say) get numeric suffixes instead of overwriting each other. Resources
//! must be saved in capture order; the suffixes depend on it.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::capture::CapturedResource;
use crate::url_model::{infer_extension, is_same_origin, url_to_local_path};

pub struct ResourceSaver {
    output_dir: PathBuf,
    base_url: String,
    include_external: bool,
    used_paths: HashSet<PathBuf>,
}

impl ResourceSaver {
    pub fn new(output_dir: impl Into<PathBuf>, base_url: impl Into<String>, include_external: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_url: base_url.into(),
            include_external,
            used_paths: HashSet::new(),
        }
    }

    /// Save one resource, returning the path it was written to, or `None`
    /// when it was skipped (wrong origin, underivable path, write failure).
    /// Skipped resources never occupy a slot in the used-path set.
    pub fn save_resource(&mut self, resource: &CapturedResource) -> Option<PathBuf> {
        if !self.include_external && !is_same_origin(&resource.url, &self.base_url) {
            return None;
        }

        let local = url_to_local_path(&resource.url, &self.output_dir)?;
        let local = PathBuf::from(infer_extension(
            &local.to_string_lossy(),
            &resource.content_type,
        ));
        let local = self.deduplicate(local);

        match write_bytes(&local, &resource.body) {
            Ok(()) => Some(local),
            Err(err) => {
                tracing::warn!(url = %resource.url, path = %local.display(), error = %err, "could not save resource");
                self.used_paths.remove(&local);
                None
            }
        }
    }

    /// Claim an unused path, suffixing the stem with `_1`, `_2`, ... until
    /// one is free.
    fn deduplicate(&mut self, path: PathBuf) -> PathBuf {
        if self.used_paths.insert(path.clone()) {
            return path;
        }

        let stem = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("")
            .to_string();
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

        for counter in 1u32.. {
            let candidate = parent.join(format!("{stem}_{counter}{ext}"));
            if self.used_paths.insert(candidate.clone()) {
                return candidate;
            }
        }
        unreachable!("u32 dedup counter space exhausted")
    }
}

fn write_bytes(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)
}

/// Save every resource, strictly in input order, returning
/// `(saved, skipped)` counts. Per-resource failures never abort the batch.
pub fn save_resources(
    resources: &[CapturedResource],
    output_dir: &Path,
    base_url: &str,
    include_external: bool,
) -> (usize, usize) {
    let mut saver = ResourceSaver::new(output_dir, base_url, include_external);

    let mut saved = 0;
    let mut skipped = 0;
    for resource in resources {
        if saver.save_resource(resource).is_some() {
            saved += 1;
        } else {
            skipped += 1;
        }
    }
    (saved, skipped)
}
