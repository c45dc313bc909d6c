use std::fmt::Display;

/// Separator between app and configuration name in a timing file name.
pub const KEY_SEPARATOR: char = '-';

/// Extension of the per-run timing files.
pub const TIMES_EXTENSION: &str = "times";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RunKeyError {
    #[error("{component} must not be empty")]
    Empty { component: &'static str },

    #[error("{component} '{value}' contains the forbidden character {found:?}")]
    ForbiddenCharacter {
        component: &'static str,
        value: String,
        found: char,
    },

    #[error("'{0}' is not a timing file name")]
    NotATimingFile(String),
}

/// Identity of one timed run: the commit it was taken on, the app and the configuration.
///
/// Components are validated on construction so that the file name derived from a key
/// parses back into the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    commit: String,
    app: String,
    config: String,
}

impl RunKey {
    pub fn new(
        commit: impl Into<String>,
        app: impl Into<String>,
        config: impl Into<String>,
    ) -> Result<RunKey, RunKeyError> {
        let key = RunKey {
            commit: commit.into(),
            app: app.into(),
            config: config.into(),
        };
        validate_component("commit hash", &key.commit, &[])?;
        validate_component("app name", &key.app, &[])?;
        validate_component("configuration name", &key.config, &[KEY_SEPARATOR])?;
        Ok(key)
    }

    /// Parse a timing file name (`<app>-<config>.times`) taken from a commit directory.
    pub fn from_file_name(commit: &str, file_name: &str) -> Result<RunKey, RunKeyError> {
        let stem = file_name
            .strip_suffix(TIMES_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| RunKeyError::NotATimingFile(file_name.to_owned()))?;
        let (app, config) = stem
            .rsplit_once(KEY_SEPARATOR)
            .ok_or_else(|| RunKeyError::NotATimingFile(file_name.to_owned()))?;
        RunKey::new(commit, app, config)
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    /// `<app>-<config>`, the common stem of every file belonging to this run.
    pub fn stem(&self) -> String {
        format!("{}{}{}", self.app, KEY_SEPARATOR, self.config)
    }

    pub fn times_file_name(&self) -> String {
        format!("{}.{}", self.stem(), TIMES_EXTENSION)
    }
}

impl Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.commit, self.app, self.config)
    }
}

fn validate_component(
    component: &'static str,
    value: &str,
    extra_forbidden: &[char],
) -> Result<(), RunKeyError> {
    if value.is_empty() {
        return Err(RunKeyError::Empty { component });
    }
    let forbidden = |c: char| {
        c == '/' || c == '\\' || c == '\0' || c.is_whitespace() || extra_forbidden.contains(&c)
    };
    match value.chars().find(|c| forbidden(*c)) {
        Some(found) => Err(RunKeyError::ForbiddenCharacter {
            component,
            value: value.to_owned(),
            found,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_name_round_trips() {
        let key = RunKey::new("a1b2c3d", "LogReg", "smp4").unwrap();
        assert_eq!(key.times_file_name(), "LogReg-smp4.times");
        let parsed = RunKey::from_file_name("a1b2c3d", &key.times_file_name()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn app_names_may_contain_the_separator() {
        let key = RunKey::new("a1b2c3d", "Delite-GDA", "cpp8").unwrap();
        let parsed = RunKey::from_file_name("a1b2c3d", &key.times_file_name()).unwrap();
        assert_eq!(parsed.app(), "Delite-GDA");
        assert_eq!(parsed.config(), "cpp8");
    }

    #[test]
    fn config_names_must_not_contain_the_separator() {
        assert_eq!(
            RunKey::new("a1b2c3d", "GDA", "smp-4"),
            Err(RunKeyError::ForbiddenCharacter {
                component: "configuration name",
                value: "smp-4".to_string(),
                found: '-',
            })
        );
    }

    #[test]
    fn rejects_path_separators_and_empty_components() {
        assert!(RunKey::new("a1b2c3d", "../GDA", "smp1").is_err());
        assert!(RunKey::new("a1/b2", "GDA", "smp1").is_err());
        assert!(RunKey::new("a1b2c3d", "GDA", "smp 1").is_err());
        assert_eq!(
            RunKey::new("", "GDA", "smp1"),
            Err(RunKeyError::Empty {
                component: "commit hash"
            })
        );
    }

    #[test]
    fn rejects_foreign_file_names() {
        assert!(RunKey::from_file_name("a1b2c3d", "GDA-smp1.delite.out").is_err());
        assert!(RunKey::from_file_name("a1b2c3d", "report.html").is_err());
        assert!(RunKey::from_file_name("a1b2c3d", "nodash.times").is_err());
        assert!(RunKey::from_file_name("a1b2c3d", "GDA-.times").is_err());
    }
}
