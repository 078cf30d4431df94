use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "ember.toml";

/// Optional per-directory settings: an entry script to run when the CLI is
/// given no argument, and REPL presentation knobs.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    pub name: Option<String>,
    pub entry: Option<PathBuf>,
    pub prompt: Option<String>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid manifest {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Deserialize)]
struct RawManifest {
    package: Option<RawPackage>,
    repl: Option<RawRepl>,
}

#[derive(Deserialize)]
struct RawPackage {
    name: Option<String>,
    entry: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawRepl {
    prompt: Option<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Looks for `ember.toml` in `dir`; a missing manifest is not an error.
    pub fn discover(dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        if path.exists() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or("> ")
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            toml::from_str(content).map_err(|error| ManifestError::Parse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let (name, entry) = match raw.package {
            Some(package) => (package.name, package.entry.map(|entry| root.join(entry))),
            None => (None, None),
        };
        Ok(Self {
            name,
            entry,
            prompt: raw.repl.and_then(|repl| repl.prompt),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_package_and_repl_sections() {
        let manifest = Manifest::parse(
            Path::new("demo/ember.toml"),
            "[package]\nname = \"demo\"\nentry = \"main.ember\"\n\n[repl]\nprompt = \">> \"\n",
        )
        .expect("parse");
        assert_eq!(manifest.name.as_deref(), Some("demo"));
        assert_eq!(manifest.entry, Some(PathBuf::from("demo/main.ember")));
        assert_eq!(manifest.prompt(), ">> ");
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = Manifest::parse(Path::new("ember.toml"), "").expect("parse");
        assert!(manifest.entry.is_none());
        assert_eq!(manifest.prompt(), "> ");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Manifest::parse(Path::new("ember.toml"), "[package\n").expect_err("fail");
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn discover_ignores_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Manifest::discover(dir.path()).expect("discover").is_none());
    }
}
