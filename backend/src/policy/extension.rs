//! Executable-extension deny list
//!
//! Unknown extensions are allowed. Double extensions (`setup.exe.zip`) and
//! names without an extension are not caught here.

/// Extensions refused for security reasons, lowercase with the leading dot
pub const DENIED_EXTENSIONS: [&str; 9] = [
    ".exe", ".bat", ".cmd", ".com", ".scr", ".vbs", ".js", ".jar", ".msi",
];

/// Lowercased extension of `name` including the dot, or an empty string when
/// the name has no `.`
#[must_use]
pub fn extension_of(name: &str) -> String {
    name.rfind('.')
        .map(|idx| name[idx..].to_lowercase())
        .unwrap_or_default()
}

/// Whether `name` may be stored
#[must_use]
pub fn is_extension_allowed(name: &str) -> bool {
    let extension = extension_of(name);
    !DENIED_EXTENSIONS.contains(&extension.as_str())
}
