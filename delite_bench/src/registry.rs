//! The set of DSLs, apps and configurations that can be benchmarked.
//!
//! The registry is a plain value built once and handed to the executor and the
//! report builder. [`Registry::standard`] describes the apps shipped with the
//! DSL tree; tests build smaller registries of their own.

use itertools::Itertools;

use crate::error::BenchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsl {
    pub name: String,
    /// Directory, relative to the repository root, that apps of this DSL are staged and run in.
    pub run_dir: String,
    pub publish_command: String,
    pub needs_publish: bool,
}

impl Dsl {
    /// A DSL generated by Forge and published to `published/<name>`.
    pub fn forge(name: &str) -> Dsl {
        Dsl {
            name: name.to_owned(),
            run_dir: format!("published/{}", name),
            publish_command: format!(
                "forge/bin/update ppl.dsl.forge.dsls.{}.{}DSLRunner {}",
                name.to_lowercase(),
                name,
                name
            ),
            needs_publish: true,
        }
    }

    pub fn with_run_dir(mut self, run_dir: &str, publish_command: &str) -> Dsl {
        self.run_dir = run_dir.to_owned();
        self.publish_command = publish_command.to_owned();
        self
    }
}

/// A named execution mode, e.g. a thread count or a target device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: String,
    pub delite_options: String,
    /// Run a single repetition; its one sample is used without warm-up filtering.
    pub run_only_once: bool,
}

impl Config {
    pub fn new(name: &str, delite_options: &str) -> Config {
        Config {
            name: name.to_owned(),
            delite_options: delite_options.to_owned(),
            run_only_once: false,
        }
    }

    pub fn once(mut self) -> Config {
        self.run_only_once = true;
        self
    }

    pub fn smp(threads: u32) -> Config {
        Config::new(&format!("smp{}", threads), &format!("-t {}", threads))
    }

    pub fn cpp(threads: u32) -> Config {
        Config::new(&format!("cpp{}", threads), &format!("-t 1 --cpp {}", threads))
    }

    pub fn gpu() -> Config {
        Config::new("gpu", "-t 1 --gpu")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Registry key used on the command line, e.g. `logreg`.
    pub key: String,
    /// Display name, also used in file names, e.g. `LogReg`.
    pub name: String,
    pub dsl: Dsl,
    pub args: String,
    pub runner_class: String,
    pub configs: Vec<Config>,
    pub delite_options: String,
    pub delitec_options: String,
}

impl App {
    pub fn new(key: &str, dsl: &Dsl, name: &str, args: &str, configs: &[Config]) -> App {
        App {
            key: key.to_owned(),
            name: name.to_owned(),
            dsl: dsl.clone(),
            args: args.to_owned(),
            runner_class: format!("{}Compiler", name),
            configs: configs.to_vec(),
            delite_options: String::new(),
            delitec_options: String::new(),
        }
    }

    pub fn runner(mut self, runner_class: &str) -> App {
        self.runner_class = runner_class.to_owned();
        self
    }

    pub fn delitec_options(mut self, options: &str) -> App {
        self.delitec_options = options.to_owned();
        self
    }

    pub fn delite_options(mut self, options: &str) -> App {
        self.delite_options = options.to_owned();
        self
    }

    pub fn config(&self, name: &str) -> Option<&Config> {
        self.configs.iter().find(|c| c.name == name)
    }

    /// `<Dsl>/<App>`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.dsl.name, self.name)
    }

    pub fn stage_command(&self) -> String {
        join_words(&[
            "bin/delitec -v --cpp",
            &self.delitec_options,
            &self.runner_class,
        ])
    }

    pub fn run_command(&self, config: &Config, runs: u16, verbose: bool) -> String {
        let runs = if config.run_only_once { 1 } else { runs };
        let mut extra_options = format!("-r {}", runs);
        if verbose {
            extra_options.push_str(" -v");
        }
        join_words(&[
            "bin/delite",
            &self.delite_options,
            &config.delite_options,
            &extra_options,
            &self.runner_class,
            &self.args,
        ])
    }
}

fn join_words(parts: &[&str]) -> String {
    parts.iter().filter(|p| !p.is_empty()).join(" ")
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub dsls: Vec<Dsl>,
    pub apps: Vec<App>,
    pub default_apps: Vec<String>,
    /// Groups of app keys compared against each other by default.
    pub default_comparisons: Vec<Vec<String>>,
}

impl Registry {
    pub fn app(&self, key: &str) -> Result<&App, BenchError> {
        self.apps
            .iter()
            .find(|a| a.key == key)
            .ok_or_else(|| BenchError::UnknownApp(key.to_owned()))
    }

    pub fn apps<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<&App>, BenchError> {
        keys.iter().map(|k| self.app(k.as_ref())).collect()
    }

    pub fn dsl(&self, name: &str) -> Result<&Dsl, BenchError> {
        self.dsls
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| BenchError::UnknownDsl(name.to_owned()))
    }

    pub fn default_apps(&self) -> Result<Vec<&App>, BenchError> {
        self.apps(&self.default_apps)
    }

    pub fn standard() -> Registry {
        let optiml = Dsl::forge("OptiML");
        let optiql = Dsl::forge("OptiQL");
        let optigraph = Dsl::forge("OptiGraph");
        let delite = Dsl::forge("Delite").with_run_dir(
            "delite",
            "sbt \"; project tests; compile\"; rm -rf delite/lib_managed; cp -r lib_managed delite",
        );

        let configs = [
            Config::smp(1),
            Config::smp(2),
            Config::smp(4),
            Config::smp(8),
            Config::cpp(1),
            Config::cpp(2),
            Config::cpp(4),
            Config::cpp(8),
        ];

        const GDA_ARGS: &str = "/data/ml/gda/1024-1200x.dat /data/ml/gda/q1y.dat";
        const LOGREG_ARGS: &str = "/data/ml/logreg/x1m10.dat /data/ml/logreg/y1m.dat";
        const KMEANS_ARGS: &str = "/data/ml/kmeans/mandrill-large.dat /data/ml/kmeans/initmu.dat";
        const RBM_ARGS: &str = "/data/ml/rbm/mnist2000.dat 2000 1000";
        const SVM_ARGS: &str = "/data/ml/svm/MATRIX.TRAIN.100 /data/ml/svm/MATRIX.TEST";
        const NB_ARGS: &str = "/data/ml/nb/MATRIX.TRAIN.RANDOM.250K /data/ml/nb/MATRIX.TEST";
        const QUERY_ARGS: &str = "/data/query/SF1";
        const GRAPH_ARGS: &str = "/data/graph/higgs.edgelist";

        let apps = vec![
            App::new("gda", &optiml, "GDA", GDA_ARGS, &configs),
            App::new("logreg", &optiml, "LogReg", LOGREG_ARGS, &configs),
            App::new("kmeans", &optiml, "kMeans", KMEANS_ARGS, &configs),
            App::new("rbm", &optiml, "RBM", RBM_ARGS, &configs),
            App::new("svm", &optiml, "SVM", SVM_ARGS, &configs),
            App::new("naivebayes", &optiml, "NaiveBayes", NB_ARGS, &configs).runner("NBCompiler"),
            App::new("query1", &optiql, "TPCHQ1", QUERY_ARGS, &configs),
            App::new("query6", &optiql, "TPCHQ6", QUERY_ARGS, &configs),
            App::new("query14", &optiql, "TPCHQ14", QUERY_ARGS, &configs),
            App::new(
                "pagerank",
                &optigraph,
                "PageRank",
                "/data/graph/higgs.edgelist /data/graph/prout.txt",
                &configs,
            ),
            App::new(
                "undirectedtrianglecounting",
                &optigraph,
                "UndirectedTriangleCounting",
                GRAPH_ARGS,
                &configs,
            ),
            App::new("delite_gda", &delite, "DeliteGDA", GDA_ARGS, &configs)
                .runner("ppl.apps.ml.gda.GDARunner"),
            App::new("delite_logreg", &delite, "DeliteLogReg", LOGREG_ARGS, &configs)
                .runner("ppl.apps.ml.logreg.LogRegRunner")
                .delitec_options("--ns"),
            App::new("delite_kmeans", &delite, "DelitekMeans", KMEANS_ARGS, &configs)
                .runner("ppl.apps.ml.kmeans.kmeansRunner"),
            App::new("delite_rbm", &delite, "DeliteRBM", RBM_ARGS, &configs)
                .runner("ppl.apps.ml.rbm.RBMRunner"),
            App::new("delite_svm", &delite, "DeliteSVM", SVM_ARGS, &configs)
                .runner("ppl.apps.ml.svm.SVMRunner"),
            App::new(
                "delite_naivebayes",
                &delite,
                "DeliteNaiveBayes",
                NB_ARGS,
                &configs,
            )
            .runner("ppl.apps.ml.nb.NaiveBayesRunner"),
            App::new("delite_query1", &delite, "DeliteTPCHQ1", QUERY_ARGS, &configs)
                .runner("ppl.apps.dataquery.tpch.TPCHQ1"),
        ];

        let default_apps = [
            "gda",
            "logreg",
            "kmeans",
            "rbm",
            "naivebayes",
            "query1",
            "query6",
            "query14",
            "pagerank",
            "undirectedtrianglecounting",
            "delite_query1",
            "delite_gda",
            "delite_logreg",
            "delite_kmeans",
            "delite_rbm",
            "delite_naivebayes",
        ];

        let default_comparisons = [
            ["gda", "delite_gda"],
            ["logreg", "delite_logreg"],
            ["kmeans", "delite_kmeans"],
            ["rbm", "delite_rbm"],
            ["naivebayes", "delite_naivebayes"],
            ["query1", "delite_query1"],
        ];

        Registry {
            dsls: vec![optiml, optiql, optigraph, delite],
            apps,
            default_apps: default_apps.iter().map(|s| s.to_string()).collect(),
            default_comparisons: default_comparisons
                .iter()
                .map(|pair| pair.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_known_app() {
        let registry = Registry::standard();
        let app = registry.app("logreg").unwrap();
        assert_eq!(app.name, "LogReg");
        assert_eq!(app.dsl.name, "OptiML");
        assert_eq!(app.qualified_name(), "OptiML/LogReg");
        assert_eq!(app.configs.len(), 8);
    }

    #[test]
    fn lookup_unknown_app_fails() {
        let registry = Registry::standard();
        let err = registry.app("nosuchapp").unwrap_err();
        assert!(matches!(err, BenchError::UnknownApp(ref key) if key == "nosuchapp"));
        assert!(err.to_string().contains("Unknown application 'nosuchapp'"));
        assert!(registry.apps(&["gda", "nosuchapp"]).is_err());
    }

    #[test]
    fn defaults_refer_to_registered_apps() {
        let registry = Registry::standard();
        assert_eq!(registry.default_apps().unwrap().len(), 16);
        for group in &registry.default_comparisons {
            assert!(registry.apps(group).is_ok());
        }
        for dsl in &registry.dsls {
            assert_eq!(registry.dsl(&dsl.name).unwrap(), dsl);
        }
    }

    #[test]
    fn configuration_names_are_usable_in_run_keys() {
        let registry = Registry::standard();
        for app in &registry.apps {
            for config in &app.configs {
                assert!(crate::run_key::RunKey::new("abc1234", &app.name, &config.name).is_ok());
            }
        }
    }

    #[test]
    fn commands() {
        let registry = Registry::standard();
        let app = registry.app("delite_logreg").unwrap();
        assert_eq!(
            app.stage_command(),
            "bin/delitec -v --cpp --ns ppl.apps.ml.logreg.LogRegRunner"
        );
        assert_eq!(
            app.run_command(&Config::smp(4), 10, false),
            "bin/delite -t 4 -r 10 ppl.apps.ml.logreg.LogRegRunner /data/ml/logreg/x1m10.dat /data/ml/logreg/y1m.dat"
        );
        assert_eq!(
            app.run_command(&Config::gpu().once(), 10, true),
            "bin/delite -t 1 --gpu -r 1 -v ppl.apps.ml.logreg.LogRegRunner /data/ml/logreg/x1m10.dat /data/ml/logreg/y1m.dat"
        );
    }

    #[test]
    fn forge_dsl_layout() {
        let dsl = Dsl::forge("OptiQL");
        assert_eq!(dsl.run_dir, "published/OptiQL");
        assert_eq!(
            dsl.publish_command,
            "forge/bin/update ppl.dsl.forge.dsls.optiql.OptiQLDSLRunner OptiQL"
        );
    }
}
