/// Base name used when a video has no usable title.
pub const UNTITLED_FALLBACK: &str = "untitled_video";

/// Longest base name we produce (leaves room for the extension and partial-file suffix).
pub const MAX_BASENAME_CHARS: usize = 180;

/// Maps an arbitrary video title to a filesystem-safe base name.
///
/// Every character outside `[A-Za-z0-9_.-]` is replaced by `_`, whitespace
/// included. Empty or whitespace-only titles map to [`UNTITLED_FALLBACK`].
/// The function is total and idempotent: applying it to its own output
/// returns the same string.
///
/// # Example
///
/// ```
/// use doramp3::core::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("My Song"), "My_Song");
/// assert_eq!(sanitize_title("AC/DC - T.N.T."), "AC_DC_-_T.N.T.");
/// assert_eq!(sanitize_title("   "), "untitled_video");
/// ```
pub fn sanitize_title(title: &str) -> String {
    if title.trim().is_empty() {
        return UNTITLED_FALLBACK.to_string();
    }

    title
        .chars()
        .take(MAX_BASENAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Title used for naming and tagging: the platform title, or the fallback when blank.
pub fn effective_title(title: &str) -> &str {
    if title.trim().is_empty() {
        UNTITLED_FALLBACK
    } else {
        title
    }
}

/// Formats a byte count for log lines ("12.34 MiB").
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.2} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
