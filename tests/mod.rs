//! Main test module for Treeline
//!
//! This module includes all test suites:
//! - Integration tests for complex multi-session scenarios
//! - Property-based tests for invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::treeline::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_repository() {
        let tmp = TempDir::new().unwrap();
        let repo = Treeline::init(tmp.path().join("repo")).unwrap();

        assert!(repo.list_branches().is_empty());
        let stats = repo.stats().unwrap();
        assert_eq!(stats.object_count, 0);
        assert_eq!(stats.commit_count, 0);

        assert!(matches!(
            repo.read_session("missing"),
            Err(TreelineError::BranchNotFound(_))
        ));
    }

    #[test]
    fn test_empty_file_content() {
        let tmp = TempDir::new().unwrap();
        let repo = Treeline::init(tmp.path().join("repo")).unwrap();
        repo.create_branch("cal").unwrap();

        let mut session = repo.write_session("cal").unwrap();
        session.root_mut().unwrap().add_file("empty.ics").unwrap();
        session.save(None).unwrap();

        let reader = repo.read_session("cal").unwrap();
        assert_eq!(reader.read("empty.ics").unwrap(), Vec::<u8>::new());
        assert_eq!(reader.read_range("empty.ics", 0, 0).unwrap(), b"");
        assert!(matches!(
            reader.read_range("empty.ics", 0, 1),
            Err(TreelineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_large_binary_content() {
        let tmp = TempDir::new().unwrap();
        let repo = Treeline::init(tmp.path().join("repo")).unwrap();
        repo.create_branch("blobs").unwrap();

        // Mixed compressible and incompressible content
        let mut payload = vec![b'a'; 512 * 1024];
        payload.extend((0..512 * 1024).map(|i| (i * 31 % 251) as u8));

        let mut session = repo.write_session("blobs").unwrap();
        session
            .root_mut()
            .unwrap()
            .add_file("big.bin")
            .unwrap()
            .set_content(payload.clone());
        session.save(None).unwrap();

        let reader = repo.read_session("blobs").unwrap();
        assert_eq!(reader.read("big.bin").unwrap(), payload);
        assert_eq!(
            reader.read_range("big.bin", 1000, 2000).unwrap(),
            payload[1000..2000]
        );
    }

    #[test]
    fn test_unicode_node_names() {
        let tmp = TempDir::new().unwrap();
        let repo = Treeline::init(tmp.path().join("repo")).unwrap();
        repo.create_branch("cal").unwrap();

        let mut session = repo.write_session("cal").unwrap();
        session
            .root_mut()
            .unwrap()
            .add_file("réunion-会議.ics")
            .unwrap()
            .set_content(b"x".to_vec());
        session.save(None).unwrap();

        let reader = repo.read_session("cal").unwrap();
        assert_eq!(reader.read("réunion-会議.ics").unwrap(), b"x");
    }

    #[test]
    fn test_many_branches() {
        let tmp = TempDir::new().unwrap();
        let repo = Treeline::init(tmp.path().join("repo")).unwrap();

        for i in 0..50 {
            let name = format!("user-{}", i);
            repo.create_branch(&name).unwrap();
            repo.with_session(&name, 0, |session| {
                session
                    .root_mut()?
                    .add_file("inbox.ics")?
                    .set_content(format!("calendar {}", i).into_bytes());
                Ok(())
            })
            .unwrap();
        }

        assert_eq!(repo.list_branches().len(), 50);
        let reader = repo.read_session("user-37").unwrap();
        assert_eq!(reader.read("inbox.ics").unwrap(), b"calendar 37");
    }
}
