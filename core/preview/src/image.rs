//! Image detection by file extension.

/// Extensions that get a preview, lowercase, with their MIME type.
pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
];

/// Lowercase extension of `file_name`.
///
/// A name needs a non-empty stem, so dotfiles such as `.png` have none.
fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for an image file name (case-insensitive), or `None` when the
/// file gets no preview.
pub fn image_mime(file_name: &str) -> Option<&'static str> {
    let ext = extension(file_name)?;
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
