/// MIME prefixes a browser can render in place.
const INLINE_PREFIXES: [&str; 4] = ["image/", "video/", "audio/", "text/"];

/// Whether content of this type should be shown rather than downloaded.
pub fn is_inline(content_type: &str) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    content_type == "application/pdf"
        || content_type.starts_with("application/pdf;")
        || INLINE_PREFIXES.iter().any(|p| content_type.starts_with(p))
}

/// `Content-Disposition` value for serving `filename` as `content_type`.
///
/// The filename is percent-encoded so the value stays a valid header for
/// any name.
pub fn content_disposition(content_type: &str, filename: &str) -> String {
    let disposition = if is_inline(content_type) {
        "inline"
    } else {
        "attachment"
    };
    format!(
        "{disposition}; filename=\"{}\"",
        urlencoding::encode(filename)
    )
}
