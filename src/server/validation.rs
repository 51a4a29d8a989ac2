use crate::server::response::ApiError;

const MAX_DIRENT_NAME_LEN: usize = 255;

/// A library name must be usable as a single directory entry.
#[must_use]
pub fn is_valid_dirent_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= MAX_DIRENT_NAME_LEN
        && !name.contains(['/', '\\', '\0'])
        && !name.trim().is_empty()
}

pub fn validate_repo_name(name: Option<&str>) -> Result<&str, ApiError> {
    match name {
        Some(name) if is_valid_dirent_name(name) => Ok(name),
        _ => Err(ApiError::bad_request("repo_name invalid.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_dirent_name("My Notes"));
        assert!(is_valid_dirent_name("notes.v2"));
        assert!(is_valid_dirent_name("..hidden"));
        assert!(is_valid_dirent_name("日本語"));
        assert!(is_valid_dirent_name(&"a".repeat(255)));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_dirent_name(""));
        assert!(!is_valid_dirent_name("."));
        assert!(!is_valid_dirent_name(".."));
        assert!(!is_valid_dirent_name("a/b"));
        assert!(!is_valid_dirent_name("a\\b"));
        assert!(!is_valid_dirent_name("a\0b"));
        assert!(!is_valid_dirent_name("   "));
        assert!(!is_valid_dirent_name(&"a".repeat(256)));
    }

    #[test]
    fn test_validate_repo_name_missing() {
        let err = validate_repo_name(None).unwrap_err();
        assert_eq!(err.message, "repo_name invalid.");
        assert_eq!(validate_repo_name(Some("Notes")).unwrap(), "Notes");
    }
}
