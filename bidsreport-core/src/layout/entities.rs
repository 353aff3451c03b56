//! BIDS filename parsing.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Entities;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[a-zA-Z]+)-(?P<value>[a-zA-Z0-9+]+)$").expect("entity pattern is valid")
});

static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("suffix pattern is valid"));

/// Split a file name into its stem and the extension starting at the first dot.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}

/// Parse `sub-01_ses-02_task-rest_run-1_bold.nii.gz` into entities.
///
/// Returns `None` when the name is not a BIDS file name (every underscore
/// separated part but the last must be a `key-value` pair and the last must be
/// a plain suffix). The datatype is not part of the name and is left unset.
pub fn parse_filename(name: &str) -> Option<Entities> {
    let (stem, extension) = split_extension(name);
    let mut parts: Vec<&str> = stem.split('_').collect();
    let suffix = parts.pop()?;
    if !SUFFIX.is_match(suffix) {
        return None;
    }

    let mut entities = Entities::new().with_suffix(suffix);
    if !extension.is_empty() {
        entities = entities.with_extension(extension);
    }
    for part in parts {
        let captures = ENTITY.captures(part)?;
        entities.insert(&captures["key"], &captures["value"]);
    }
    Some(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let entities = parse_filename("sub-01_ses-02_task-rest_acq-mb4_run-3_echo-1_bold.nii.gz")
            .unwrap();
        assert_eq!(entities.subject(), Some("01"));
        assert_eq!(entities.session(), Some("02"));
        assert_eq!(entities.task(), Some("rest"));
        assert_eq!(entities.get("acq"), Some("mb4"));
        assert_eq!(entities.run(), Some(3));
        assert_eq!(entities.get("echo"), Some("1"));
        assert_eq!(entities.suffix(), "bold");
        assert_eq!(entities.extension.as_deref(), Some(".nii.gz"));
        assert_eq!(entities.datatype, None);
    }

    #[test]
    fn test_parse_inheritable_sidecar() {
        let entities = parse_filename("task-rest_bold.json").unwrap();
        assert_eq!(entities.task(), Some("rest"));
        assert_eq!(entities.subject(), None);
        assert_eq!(entities.extension.as_deref(), Some(".json"));
    }

    #[test]
    fn test_parse_rejects_non_bids() {
        assert!(parse_filename("dataset_description.json").is_none());
        assert!(parse_filename("README").is_some_and(|e| e.suffix() == "README"));
        assert!(parse_filename("sub-01_task-rest_run-1.nii.gz").is_none());
        assert!(parse_filename("sub-01__bold.nii").is_none());
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a_bold.nii.gz"), ("a_bold", ".nii.gz"));
        assert_eq!(split_extension("CHANGES"), ("CHANGES", ""));
    }
}
