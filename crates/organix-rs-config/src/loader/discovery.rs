//! Where config layers live on disk.

use super::{ConfigLayerSource, LayeredConfigOptions};
use directories::UserDirs;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub(super) const CONFIG_FILE: &str = "organix.json5";
pub(super) const CONFIG_DIR: &str = ".organix";

/// A layer file the loader should try, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Candidate {
    pub(super) source: ConfigLayerSource,
    pub(super) path: PathBuf,
    /// Missing required files are an error; missing optional ones are skipped.
    pub(super) required: bool,
}

/// `~/.organix/organix.json5`.
pub(super) fn user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Closest ancestor of `cwd` (itself included) holding one of `markers`.
pub(super) fn project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Ordered candidate list, lowest precedence first. A file reachable through
/// two sources (cwd is the project root, say) appears once, under the first.
pub(super) fn candidates(options: &LayeredConfigOptions, cwd: &Path) -> Vec<Candidate> {
    let optional = |source, path: PathBuf| Candidate {
        source,
        path,
        required: false,
    };
    let root = project_root(cwd, &options.project_root_markers);

    let mut planned = Vec::new();
    if let Some(path) = &options.user_config_path {
        planned.push(optional(ConfigLayerSource::User, path.clone()));
    }
    if let Some(root) = &root {
        planned.push(optional(ConfigLayerSource::Project, root.join(CONFIG_FILE)));
    }
    planned.push(optional(ConfigLayerSource::Cwd, cwd.join(CONFIG_FILE)));
    if let Some(root) = &root {
        planned.push(optional(
            ConfigLayerSource::Repo,
            root.join(CONFIG_DIR).join(CONFIG_FILE),
        ));
    }
    planned.extend(options.runtime_paths.iter().map(|path| Candidate {
        source: ConfigLayerSource::Runtime,
        path: path.clone(),
        required: true,
    }));

    let mut seen = HashSet::new();
    planned.retain(|candidate| seen.insert(identity(&candidate.path)));
    planned
}

fn identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_FILE, candidates, project_root};
    use crate::loader::{ConfigLayerSource, LayeredConfigOptions};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn project_root_walks_up_to_the_marker() {
        let temp = TempDir::new().expect("tmp");
        let nested = temp.path().join("repo/a/b");
        fs::create_dir_all(&nested).expect("dirs");
        fs::create_dir_all(temp.path().join("repo/.git")).expect("git");
        let markers = vec![".git".to_string()];
        assert_eq!(
            project_root(&nested, &markers),
            Some(temp.path().join("repo"))
        );
        assert_eq!(project_root(temp.path(), &markers), None);
    }

    #[test]
    fn cwd_at_project_root_is_listed_once() {
        let temp = TempDir::new().expect("tmp");
        fs::create_dir_all(temp.path().join(".git")).expect("git");
        fs::write(temp.path().join(CONFIG_FILE), "{}").expect("write");
        let options = LayeredConfigOptions {
            user_config_path: None,
            ..LayeredConfigOptions::new(temp.path())
        };
        let sources = candidates(&options, temp.path())
            .into_iter()
            .map(|candidate| candidate.source)
            .collect::<Vec<_>>();
        assert_eq!(sources, vec![ConfigLayerSource::Project, ConfigLayerSource::Repo]);
    }
}
