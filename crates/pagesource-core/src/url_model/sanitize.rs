//! Per-segment path sanitization, safe across common filesystems.

/// Maximum length of a single path component, in characters.
const MAX_COMPONENT_LEN: usize = 100;

/// Device names that cannot be used as filenames on Windows, even with an
/// extension (`CON.txt` is just as reserved as `CON`).
const RESERVED_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitizes one path component for filesystem safety.
///
/// - Replaces control characters and `< > : " | ? * \` with `_`
/// - Prefixes reserved device names (checked before the first `.`) with `_`
/// - Maps empty, `.`, and `..` to `_`
/// - Truncates the stem to keep the whole component within 100 characters
///   while preserving the extension
pub fn sanitize_component(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }

    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\') {
                '_'
            } else {
                c
            }
        })
        .collect();

    let base = out.split('.').next().unwrap_or("");
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| base.eq_ignore_ascii_case(reserved))
    {
        out.insert(0, '_');
    }

    if out.is_empty() || out == "." || out == ".." {
        return "_".to_string();
    }

    if out.chars().count() > MAX_COMPONENT_LEN {
        let (stem, ext) = split_extension(&out);
        let max_stem = MAX_COMPONENT_LEN.saturating_sub(ext.chars().count());
        let stem: String = stem.chars().take(max_stem).collect();
        out = format!("{stem}{ext}");
    }

    out
}

/// Splits a filename into stem and extension (extension includes the dot).
/// Only the last dot counts, so `app.min.js` splits as (`app.min`, `.js`).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}
