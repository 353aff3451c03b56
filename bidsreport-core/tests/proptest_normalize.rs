//! Property-based tests for the parameter normalizer using proptest.

use proptest::prelude::*;
use std::path::{Path, PathBuf};

use bidsreport_core::describe::scan_type;
use bidsreport_core::normalize::{
    SliceOrder, bval_path, classify_slice_timing, list_to_str, milli, num_to_str,
    number_to_words, ordinal_words, run_set,
};
use bidsreport_core::{Entities, Metadata, ScanFile};

// --- English lists ---

proptest! {
    #[test]
    fn list_keeps_every_item_in_order(items in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let joined = list_to_str(&items);
        let mut cursor = 0;
        for item in &items {
            let found = joined[cursor..].find(item.as_str());
            prop_assert!(found.is_some());
            cursor += found.unwrap() + item.len();
        }
    }

    #[test]
    fn list_separators_match_length(items in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let joined = list_to_str(&items);
        let commas = joined.matches(", ").count();
        match items.len() {
            1 => prop_assert_eq!(joined, items[0].clone()),
            2 => {
                prop_assert_eq!(commas, 0);
                prop_assert!(joined.contains(" and "));
            }
            n => {
                prop_assert_eq!(commas, n - 1);
                prop_assert!(joined.contains(", and "));
            }
        }
    }
}

// --- Numbers ---

proptest! {
    #[test]
    fn integral_numbers_have_no_decimals(n in -1_000_000i64..1_000_000) {
        prop_assert_eq!(num_to_str(n as f64), n.to_string());
    }

    #[test]
    fn numbers_keep_at_most_two_decimals(x in -10_000.0f64..10_000.0) {
        let text = num_to_str(x);
        if let Some((_, decimals)) = text.split_once('.') {
            prop_assert!(decimals.len() <= 2);
            prop_assert!(!decimals.ends_with('0'));
        }
    }

    #[test]
    fn milli_is_exact_on_thousandths(k in 0u32..10_000_000) {
        let seconds = f64::from(k) / 1000.0;
        prop_assert_eq!(milli(seconds), f64::from(k));
    }

    #[test]
    fn spelled_numbers_have_no_digits(n in 0u64..=999_999) {
        prop_assert!(!number_to_words(n).chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn ordinals_have_ordinal_endings(n in 1u64..2_000_000) {
        let ordinal = ordinal_words(n);
        prop_assert!(
            ["st", "nd", "rd", "th"].iter().any(|s| ordinal.ends_with(s)),
            "{} gave {}", n, ordinal
        );
    }
}

// --- Acquisition parameters ---

fn file(run: Option<u32>) -> ScanFile {
    let mut entities = Entities::new()
        .with("sub", "01")
        .with("task", "rest")
        .with_datatype("func")
        .with_suffix("bold");
    if let Some(run) = run {
        entities.insert("run", run.to_string());
    }
    ScanFile::new("sub-01/func/x.nii.gz", entities, Metadata::new())
}

proptest! {
    #[test]
    fn runs_default_to_one(count in 1usize..5) {
        let files: Vec<ScanFile> = (0..count).map(|_| file(None)).collect();
        prop_assert_eq!(run_set(&files).into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn runs_are_distinct_and_sorted(runs in prop::collection::vec(1u32..20, 1..10)) {
        let files: Vec<ScanFile> = runs.iter().map(|r| file(Some(*r))).collect();
        let mut expected = runs.clone();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(run_set(&files).into_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn bval_path_replaces_nifti_extension(stem in "sub-[a-z0-9]{1,6}_dwi", gz in any::<bool>()) {
        let ext = if gz { ".nii.gz" } else { ".nii" };
        let image = PathBuf::from(format!("data/{stem}{ext}"));
        prop_assert_eq!(bval_path(&image), Some(PathBuf::from(format!("data/{stem}.bval"))));
    }

    #[test]
    fn bval_path_ignores_other_extensions(stem in "[a-z]{1,6}", ext in "\\.(mif|mgz|json)") {
        let image = format!("{stem}{ext}");
        prop_assert_eq!(bval_path(Path::new(&image)), None);
    }

    #[test]
    fn scan_type_expands_trailing_w(stem in "[A-Z][A-Za-z0-9]{0,4}[0-9]") {
        prop_assert_eq!(scan_type(&format!("{stem}w")), format!("{stem}-weighted"));
        prop_assert_eq!(scan_type(&stem), stem.clone());
    }

    #[test]
    fn sorted_slice_times_are_ascending(mut times in prop::collection::vec(0.0f64..3.0, 2..60)) {
        times.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(classify_slice_timing(&times), SliceOrder::SequentialAscending);
    }
}
