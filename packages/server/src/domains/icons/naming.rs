//! File names for staged icons.

use std::collections::HashSet;

/// Reduce an app name to a safe file stem.
///
/// Letters, digits, `-`, `_` and `.` are kept, whitespace becomes `_`,
/// everything else is dropped. Leading and trailing dots are stripped so the
/// result can never be `..` or a hidden file.
pub fn sanitize_file_stem(app_name: &str) -> String {
    let stem: String = app_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "app".to_string()
    } else {
        stem.to_string()
    }
}

/// Hands out unique `.png` names within one job.
///
/// Uniqueness is case-insensitive since staging may land on a
/// case-insensitive filesystem.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self, app_name: &str) -> String {
        let stem = sanitize_file_stem(app_name);
        let mut candidate = format!("{}.png", stem);
        let mut n = 2;
        while !self.used.insert(candidate.to_lowercase()) {
            candidate = format!("{}-{}.png", stem, n);
            n += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_characters() {
        assert_eq!(sanitize_file_stem("Visual Studio Code"), "Visual_Studio_Code");
        assert_eq!(sanitize_file_stem("1Password 7"), "1Password_7");
        assert_eq!(sanitize_file_stem("Logic Pro X/../etc"), "Logic_Pro_X..etc");
        assert_eq!(sanitize_file_stem("Café"), "Café");
    }

    #[test]
    fn never_empty_or_hidden() {
        assert_eq!(sanitize_file_stem(""), "app");
        assert_eq!(sanitize_file_stem("///"), "app");
        assert_eq!(sanitize_file_stem(".."), "app");
        assert_eq!(sanitize_file_stem(".hidden"), "hidden");
    }

    #[test]
    fn collisions_get_suffixes() {
        let mut namer = FileNamer::new();
        assert_eq!(namer.next_name("Notes"), "Notes.png");
        assert_eq!(namer.next_name("Notes"), "Notes-2.png");
        assert_eq!(namer.next_name("notes"), "notes-3.png");
        assert_eq!(namer.next_name("Notes?"), "Notes-4.png");
        assert_eq!(namer.next_name("Mail"), "Mail.png");
    }
}
