//! Property-based testing for Treeline
//!
//! Uses proptest to verify invariants across randomly generated content,
//! ranges, and tree shapes.

use ::treeline::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Random node names valid in a directory
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}(\\.[a-z]{2,4})?"
}

/// Random file content across text, binary, and repetitive shapes
fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-zA-Z0-9 \n]{0,500}".prop_map(|s| s.into_bytes()),
        prop::collection::vec(any::<u8>(), 0..4000),
        (any::<u8>(), 0..2000usize).prop_map(|(byte, count)| vec![byte; count]),
    ]
}

fn fresh_repo() -> (Treeline, TempDir) {
    let tmp = TempDir::new().unwrap();
    let repo = Treeline::init(tmp.path().join("repo")).unwrap();
    (repo, tmp)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Stored content always reads back byte-identical, whole or in ranges
    #[test]
    fn prop_store_round_trip(content in content_strategy(), cut in 0..=100u64) {
        let (repo, _tmp) = fresh_repo();
        repo.create_branch("p").unwrap();

        repo.with_session("p", 0, |session| {
            session.root_mut()?.add_file("f")?.set_content(content.clone());
            Ok(())
        }).unwrap();

        let reader = repo.read_session("p").unwrap();
        prop_assert_eq!(reader.read("f").unwrap(), content.clone());

        // Any in-bounds half-open range equals the same slice of the content
        let len = content.len() as u64;
        let start = (cut * len) / 100;
        let end = len - (len - start) / 2;
        let got = reader.read_range("f", start, end).unwrap();
        prop_assert_eq!(&got[..], &content[start as usize..end as usize]);
    }

    /// Out-of-bounds and inverted ranges always fail, never panic or truncate
    #[test]
    fn prop_invalid_ranges_rejected(content in content_strategy(), delta in 1..1000u64) {
        let (repo, _tmp) = fresh_repo();
        repo.create_branch("p").unwrap();
        repo.with_session("p", 0, |session| {
            session.root_mut()?.add_file("f")?.set_content(content.clone());
            Ok(())
        }).unwrap();

        let reader = repo.read_session("p").unwrap();
        let len = content.len() as u64;

        prop_assert!(
            matches!(
                reader.read_range("f", 0, len + delta),
                Err(TreelineError::InvalidRange { .. })
            ),
            "expected InvalidRange for end past length"
        );
        prop_assert!(
            matches!(
                reader.read_range("f", len + delta, len + delta + 1),
                Err(TreelineError::InvalidRange { .. })
            ),
            "expected InvalidRange for start past length"
        );
        if len > 0 {
            prop_assert!(
                matches!(
                    reader.read_range("f", len, len - 1),
                    Err(TreelineError::InvalidRange { .. })
                ),
                "expected InvalidRange for inverted range"
            );
        }
    }

    /// Identical content never grows the object store
    #[test]
    fn prop_dedup_is_stable(content in content_strategy(), copies in 2..6usize) {
        let (repo, _tmp) = fresh_repo();
        repo.create_branch("p").unwrap();

        for i in 0..copies {
            repo.with_session("p", 0, |session| {
                session
                    .root_mut()?
                    .add_file(&format!("copy-{}", i))?
                    .set_content(content.clone());
                Ok(())
            }).unwrap();
        }

        // One content blob; tree blobs differ per commit since names differ
        let reader = repo.read_session("p").unwrap();
        let mut hashes = Vec::new();
        for i in 0..copies {
            let file = reader.root().file(&format!("copy-{}", i)).unwrap();
            hashes.push(file.content_hash().unwrap().to_string());
        }
        hashes.dedup();
        prop_assert_eq!(hashes.len(), 1);
    }

    /// Change-tags are a pure function of tree content, not build order
    #[test]
    fn prop_change_tag_is_order_independent(
        entries in prop::collection::btree_map(name_strategy(), content_strategy(), 1..12)
    ) {
        let (repo, _tmp) = fresh_repo();
        repo.create_branch("fwd").unwrap();
        repo.create_branch("rev").unwrap();

        let build = |branch: &str, items: Vec<(&String, &Vec<u8>)>| {
            repo.with_session(branch, 0, |session| {
                for (name, content) in &items {
                    session
                        .root_mut()?
                        .add_file(name)?
                        .set_content((*content).clone());
                }
                Ok(())
            }).unwrap();
        };

        let forward: Vec<_> = entries.iter().collect();
        let mut reverse = forward.clone();
        reverse.reverse();

        build("fwd", forward);
        build("rev", reverse);

        prop_assert_eq!(
            repo.change_tag("fwd").unwrap(),
            repo.change_tag("rev").unwrap()
        );
    }

    /// Saving a session always leaves the branch readable and consistent
    #[test]
    fn prop_saved_tree_matches_staged_state(
        entries in prop::collection::btree_map(name_strategy(), content_strategy(), 0..10)
    ) {
        let (repo, _tmp) = fresh_repo();
        repo.create_branch("p").unwrap();

        let expected: BTreeMap<String, Vec<u8>> = entries;
        repo.with_session("p", 0, |session| {
            for (name, content) in &expected {
                session.root_mut()?.add_file(name)?.set_content(content.clone());
            }
            Ok(())
        }).unwrap();

        let reader = repo.read_session("p").unwrap();
        prop_assert_eq!(reader.root().len(), expected.len());
        for (name, content) in &expected {
            prop_assert_eq!(&reader.read(name).unwrap(), content);
        }
    }
}
