use std::collections::HashMap;

use anyhow::Result;
use log::{debug, trace};

use crate::{
    aggregator::{AggregatedResult, Aggregator},
    data::SampleSet,
    registry::{App, Config},
    run_key::RunKey,
    sample_store::SampleStore,
};

/// The newest `bars` commits of `log` that have a timing directory in the store.
///
/// `log` is expected newest first, as printed by `git log`.
pub fn timed_hashes<S: AsRef<str>>(store: &SampleStore, log: &[S], bars: usize) -> Vec<String> {
    log.iter()
        .map(|hash| hash.as_ref())
        .filter(|hash| store.has_commit(hash))
        .take(bars)
        .map(str::to_owned)
        .collect()
}

/// All stored samples of one commit for a set of apps.
///
/// Runs without a timing file are simply absent, and so is everything for a
/// commit that was never timed.
#[derive(Debug, Clone)]
pub struct CommitSamples {
    commit: String,
    samples: HashMap<(String, String), SampleSet>,
}

impl CommitSamples {
    pub fn load(store: &SampleStore, commit: &str, apps: &[&App]) -> Result<CommitSamples> {
        let mut samples = HashMap::new();
        if !store.has_commit(commit) {
            debug!("No timing directory for commit {}", commit);
        } else {
            for key in store.list_keys(commit)? {
                let requested = apps.iter().any(|app| {
                    app.name == key.app() && app.configs.iter().any(|c| c.name == key.config())
                });
                if !requested {
                    trace!("Not loading {}", key);
                    continue;
                }
                if let Some(set) = store.read(&key)? {
                    samples.insert((key.app().to_owned(), key.config().to_owned()), set);
                }
            }
        }
        debug!("Loaded {} sample sets for {}", samples.len(), commit);
        Ok(CommitSamples {
            commit: commit.to_owned(),
            samples,
        })
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn get(&self, app: &str, config: &str) -> Option<&SampleSet> {
        self.samples.get(&(app.to_owned(), config.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn aggregate(
        &self,
        app: &App,
        config: &Config,
        aggregator: &Aggregator,
    ) -> Result<AggregatedResult> {
        let key = RunKey::new(&self.commit, &app.name, &config.name)?;
        let result = aggregator.aggregate(key, self.get(&app.name, &config.name), config);
        trace!("{}", result);
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{aggregator::WarmupPolicy, registry::Registry, test_helpers::write_times};
    use tempfile::tempdir;

    #[test]
    fn only_timed_commits_are_listed() {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        for hash in ["ccc", "aaa", "eee"] {
            std::fs::create_dir_all(store.commit_dir(hash)).unwrap();
        }
        let log = ["eee", "ddd", "ccc", "bbb", "aaa"];

        assert_eq!(timed_hashes(&store, &log, 2), vec!["eee", "ccc"]);
        assert_eq!(timed_hashes(&store, &log, 10), vec!["eee", "ccc", "aaa"]);
        assert!(timed_hashes(&store, &log, 0).is_empty());
    }

    #[test]
    fn load_commit_samples() {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        let registry = Registry::standard();
        let logreg = registry.app("logreg").unwrap();
        let smp4 = logreg.config("smp4").unwrap();
        let key = RunKey::new("aaa1111", "LogReg", "smp4").unwrap();
        store
            .write(&key, &SampleSet::from(vec![10.0, 20.0, 30.0, 40.0]))
            .unwrap();

        let loaded = CommitSamples::load(&store, "aaa1111", &[logreg]).unwrap();
        assert_eq!(loaded.commit(), "aaa1111");
        assert_eq!(loaded.get("LogReg", "smp4").unwrap().len(), 4);
        assert!(loaded.get("LogReg", "smp1").is_none());

        let aggregator = Aggregator::new(WarmupPolicy::HalfDiscard);
        let result = loaded.aggregate(logreg, smp4, &aggregator).unwrap();
        assert_eq!(result.mean, 35.0);

        let missing = CommitSamples::load(&store, "bbb2222", &[logreg]).unwrap();
        assert!(missing.is_empty());
        let result = missing.aggregate(logreg, smp4, &aggregator).unwrap();
        assert!(!result.stored);
        assert_eq!(result.mean, 0.0);
    }

    #[test]
    fn only_requested_runs_are_loaded() {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        let registry = Registry::standard();
        let logreg = registry.app("logreg").unwrap();
        write_times(dir.path(), "aaa1111", "LogReg", "smp1", &[3_000_000, 1_000_000]);
        write_times(dir.path(), "aaa1111", "GDA", "smp1", &[2_000_000]);
        write_times(dir.path(), "aaa1111", "LogReg", "smp3", &[2_000_000]);

        let loaded = CommitSamples::load(&store, "aaa1111", &[logreg]).unwrap();
        assert_eq!(
            loaded.get("LogReg", "smp1"),
            Some(&SampleSet::from(vec![3.0, 1.0]))
        );
        assert!(loaded.get("GDA", "smp1").is_none());
        assert!(loaded.get("LogReg", "smp3").is_none());
    }
}
