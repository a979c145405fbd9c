use regex::Regex;


/// Reduces an uploaded filename to a safe ascii name: path separators and
/// whitespace become `_`, everything outside `[A-Za-z0-9_.-]` is dropped.
pub fn sanitize_filename(filename: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
    let spaced = filename.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<&str>>().join("_");
    re.replace_all(&joined, "").trim_matches(|c| c == '.' || c == '_').to_string()
}

pub fn file_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_lowercase())
    }
}
