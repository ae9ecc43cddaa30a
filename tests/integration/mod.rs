//! Comprehensive integration tests for Treeline
//!
//! Tests complex multi-session scenarios: randomized operation sequences
//! checked against a reference model, interleaved writers, and history
//! navigation across reopens.

use ::treeline::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tempfile::TempDir;
use tracing::info;
use tracing_test::traced_test;

/// Test harness driving a repository alongside an in-memory reference model
pub struct TreelineTestHarness {
    pub temp_dir: TempDir,
    pub repo: Treeline,
    pub rng: StdRng,
    /// Expected branch content: name -> bytes
    pub model: BTreeMap<String, Vec<u8>>,
    pub operation_log: Vec<TestOperation>,
}

#[derive(Debug, Clone)]
pub enum TestOperation {
    Create { name: String, content: Vec<u8> },
    Modify { name: String, content: Vec<u8> },
    Delete { name: String },
    Save,
}

impl TreelineTestHarness {
    pub fn new(seed: u64) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let repo = TreelineBuilder::new()
            .compression_strategy(CompressionStrategy::Fast)
            .build(temp_dir.path().join("repo"))
            .unwrap();
        repo.create_branch("model").unwrap();

        Self {
            temp_dir,
            repo,
            rng: StdRng::seed_from_u64(seed),
            model: BTreeMap::new(),
            operation_log: Vec::new(),
        }
    }

    fn random_name(&mut self) -> String {
        format!("node-{}.dat", self.rng.random_range(0..20))
    }

    fn random_content(&mut self) -> Vec<u8> {
        let len = self.rng.random_range(0..2048);
        (0..len).map(|_| self.rng.random()).collect()
    }

    /// Pick and apply one random operation to both repo session and model
    pub fn step(&mut self, session: &mut DataSession) -> Result<()> {
        let op = match self.rng.random_range(0..4) {
            0 | 1 => {
                let name = self.random_name();
                let content = self.random_content();
                TestOperation::Create {
                    name,
                    content,
                }
            }
            2 => match self.model.keys().next().cloned() {
                Some(name) => {
                    let content = self.random_content();
                    TestOperation::Modify { name, content }
                }
                None => return Ok(()),
            },
            _ => match self.model.keys().last().cloned() {
                Some(name) => TestOperation::Delete { name },
                None => return Ok(()),
            },
        };

        match &op {
            TestOperation::Create { name, content }
            | TestOperation::Modify { name, content } => {
                session
                    .root_mut()?
                    .add_file(name)?
                    .set_content(content.clone());
                self.model.insert(name.clone(), content.clone());
            }
            TestOperation::Delete { name } => {
                session.root_mut()?.remove(name);
                self.model.remove(name);
            }
            TestOperation::Save => {}
        }
        self.operation_log.push(op);
        Ok(())
    }

    /// Check that a fresh read session matches the model exactly
    pub fn verify(&self) {
        let reader = self.repo.read_session("model").unwrap();
        assert_eq!(
            reader.root().len(),
            self.model.len(),
            "node count diverged after {} operations",
            self.operation_log.len()
        );
        for (name, expected) in &self.model {
            assert_eq!(&reader.read(name).unwrap(), expected, "content of '{}'", name);
        }
    }
}

#[test]
#[traced_test]
fn test_randomized_operations_match_model() {
    let mut harness = TreelineTestHarness::new(42);

    for round in 0..10 {
        let mut session = harness.repo.write_session("model").unwrap();
        for _ in 0..25 {
            harness.step(&mut session).unwrap();
        }
        session.save(None).unwrap();
        harness.operation_log.push(TestOperation::Save);
        harness.verify();
        info!("Round {} verified, {} nodes live", round, harness.model.len());
    }
}

#[test]
fn test_model_survives_reopen() {
    let mut harness = TreelineTestHarness::new(7);

    let mut session = harness.repo.write_session("model").unwrap();
    for _ in 0..50 {
        harness.step(&mut session).unwrap();
    }
    session.save(None).unwrap();

    // Reopen from disk and re-verify against the same model
    let root = harness.temp_dir.path().join("repo");
    harness.repo = Treeline::open(root).unwrap();
    harness.verify();
}

#[test]
fn test_interleaved_writers_converge() {
    let tmp = TempDir::new().unwrap();
    let repo = Treeline::init(tmp.path().join("repo")).unwrap();
    repo.create_branch("shared").unwrap();

    // Two writers alternate commits, each refreshing before writing
    for turn in 0..6 {
        let writer = format!("writer-{}", turn % 2);
        repo.with_session("shared", 1, |session| {
            session
                .root_mut()?
                .add_file(&format!("turn-{}.txt", turn))?
                .set_content(writer.clone().into_bytes());
            Ok(())
        })
        .unwrap();
    }

    let reader = repo.read_session("shared").unwrap();
    assert_eq!(reader.root().len(), 6);
    assert_eq!(repo.history("shared").unwrap().len(), 6);

    // Commit chain parents link each commit to its predecessor
    let history = repo.history("shared").unwrap();
    for pair in history.windows(2) {
        assert_eq!(pair[0].parent_id.as_deref(), Some(pair[1].id.as_str()));
    }
}

#[test]
fn test_history_reconstructs_old_trees() {
    let tmp = TempDir::new().unwrap();
    let repo = Treeline::init(tmp.path().join("repo")).unwrap();
    repo.create_branch("cal").unwrap();

    let mut tags = Vec::new();
    for version in 1..=3 {
        repo.with_session("cal", 0, |session| {
            session
                .root_mut()?
                .add_file("doc.txt")?
                .set_content(format!("version {}", version).into_bytes());
            Ok(())
        })
        .unwrap();
        tags.push(repo.change_tag("cal").unwrap());
    }

    // Every historic root tree is still materializable from the store
    let history = repo.history("cal").unwrap();
    assert_eq!(history.len(), 3);
    let reader = repo.read_session("cal").unwrap();
    for (commit, tag) in history.iter().zip(tags.iter().rev()) {
        assert_eq!(commit.change_tag(), tag);
        assert!(reader.store().contains(&commit.root_hash));
    }
}

#[test]
fn test_stale_session_cannot_clobber() {
    let tmp = TempDir::new().unwrap();
    let repo = Treeline::init(tmp.path().join("repo")).unwrap();
    repo.create_branch("cal").unwrap();

    let mut stale = repo.write_session("cal").unwrap();
    stale
        .root_mut()
        .unwrap()
        .add_file("stale.txt")
        .unwrap()
        .set_content(b"old view".to_vec());

    // Another session commits first
    repo.with_session("cal", 0, |session| {
        session
            .root_mut()?
            .add_file("fresh.txt")?
            .set_content(b"new".to_vec());
        Ok(())
    })
    .unwrap();

    // The stale session keeps failing until it refreshes
    assert!(stale.save(None).unwrap_err().is_retryable());
    assert!(stale.is_stale());
    assert!(stale.save(None).unwrap_err().is_retryable());

    stale.refresh().unwrap();
    assert_eq!(stale.read("fresh.txt").unwrap(), b"new");
    // Local mutation was discarded by the refresh
    assert!(stale.file("stale.txt").is_none());
}
