//! Extension inference from the Content-Type header.

use std::ffi::OsStr;
use std::path::Path;

/// Appends a file extension inferred from `content_type` when the path's
/// filename has none. Paths that already contain a `.` are left unchanged,
/// as are paths whose MIME type is unknown.
pub fn infer_extension(path: &str, content_type: &str) -> String {
    let filename = Path::new(path)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("");
    if filename.contains('.') {
        return path.to_string();
    }

    // Strip parameters (charset, boundary, ...) before the lookup.
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match extension_for_mime(&mime) {
        Some(ext) => format!("{path}{ext}"),
        None => path.to_string(),
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        // Text
        "text/html" => ".html",
        "text/css" => ".css",
        "text/javascript" => ".js",
        "text/plain" => ".txt",
        "text/xml" => ".xml",
        // Application
        "application/javascript" => ".js",
        "application/x-javascript" => ".js",
        "application/json" => ".json",
        "application/xml" => ".xml",
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "application/wasm" => ".wasm",
        "application/manifest+json" => ".webmanifest",
        // Images
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/svg+xml" => ".svg",
        "image/webp" => ".webp",
        "image/x-icon" => ".ico",
        "image/vnd.microsoft.icon" => ".ico",
        "image/avif" => ".avif",
        // Fonts
        "font/woff" => ".woff",
        "font/woff2" => ".woff2",
        "font/ttf" => ".ttf",
        "font/otf" => ".otf",
        "application/font-woff" => ".woff",
        "application/font-woff2" => ".woff2",
        "application/x-font-woff" => ".woff",
        "application/x-font-ttf" => ".ttf",
        "application/vnd.ms-fontobject" => ".eot",
        // Audio/Video
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        "audio/ogg" => ".ogg",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "video/ogg" => ".ogv",
        _ => return None,
    };
    Some(ext)
}
