//! File extension arithmetic
//!
//! A file name splits into (stem, extension) the way most tools do it: the
//! extension starts at the last dot, but leading dots belong to the stem, so
//! `.bashrc` has no extension and `archive.tar.gz` has `.gz`.
//!
//! Mutation appends one digit in `1..=9` to the extension; restoration
//! removes exactly one trailing character.

/// Lowest suffix digit ever produced
pub const MIN_SUFFIX: u8 = 1;

/// Highest suffix digit ever produced
pub const MAX_SUFFIX: u8 = 9;

/// Shortest extension that can carry an obfuscation digit (dot + digit)
const MIN_MUTATED_EXTENSION: usize = 2;

/// Split a file name into `(stem, extension)`.
///
/// The extension includes its leading dot. Names without a dot, or whose
/// only dots are leading, have an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Every suffix digit, `'1'..='9'`
pub fn suffixes() -> impl Iterator<Item = char> {
    (MIN_SUFFIX..=MAX_SUFFIX).map(|digit| char::from(b'0' + digit))
}

/// Name a file gets after mutation, or `None` if it has no extension
pub fn mutated_name(name: &str, suffix: char) -> Option<String> {
    let (stem, ext) = split_extension(name);
    if ext.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(name.len() + 1);
    out.push_str(stem);
    out.push_str(ext);
    out.push(suffix);
    Some(out)
}

/// Name a mutated file gets after restoration.
///
/// Returns the offending extension as the error when it is too short to
/// have carried a suffix.
pub fn restored_name(name: &str) -> Result<String, String> {
    let (stem, ext) = split_extension(name);
    if ext.chars().count() < MIN_MUTATED_EXTENSION {
        return Err(ext.to_string());
    }

    let mut ext = ext.to_string();
    ext.pop();
    Ok(format!("{}{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.txt"), ("a", ".txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("..hidden"), ("..hidden", ""));
        assert_eq!(split_extension(".config.toml"), (".config", ".toml"));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
    }

    #[test]
    fn test_suffixes() {
        let all: String = suffixes().collect();
        assert_eq!(all, "123456789");
    }

    #[test]
    fn test_mutated_name() {
        assert_eq!(mutated_name("a.txt", '4').as_deref(), Some("a.txt4"));
        assert_eq!(mutated_name("b.log", '7').as_deref(), Some("b.log7"));
        assert_eq!(mutated_name("x.tar.gz", '1').as_deref(), Some("x.tar.gz1"));
        assert_eq!(mutated_name("README", '3'), None);
        assert_eq!(mutated_name(".bashrc", '3'), None);
    }

    #[test]
    fn test_restored_name() {
        assert_eq!(restored_name("a.txt4").unwrap(), "a.txt");
        assert_eq!(restored_name("x.tar.gz1").unwrap(), "x.tar.gz");
        assert_eq!(restored_name("trailing.5").unwrap(), "trailing.");
        assert_eq!(restored_name("README"), Err(String::new()));
        assert_eq!(restored_name("odd."), Err(".".to_string()));
    }

    #[test]
    fn test_restore_strips_any_digit() {
        for d in '1'..='9' {
            let mutated = mutated_name("photo.jpeg", d).unwrap();
            assert_eq!(restored_name(&mutated).unwrap(), "photo.jpeg");
        }
    }
}
