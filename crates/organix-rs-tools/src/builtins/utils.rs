use organix_rs_protocol::ToolError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArgs(err.to_string()))
}

/// Join `input` onto `root` lexically. Absolute inputs and `..` segments that
/// climb above `root` are rejected; symlinks are not followed.
pub(super) fn confine(root: &Path, input: &str) -> Result<PathBuf, ToolError> {
    let outside = |why: &str| ToolError::InvalidArgs(format!("{input}: {why}"));

    let mut depth = 0usize;
    let mut joined = root.to_path_buf();
    for component in Path::new(input).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => {
                joined.push(segment);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                joined.pop();
                depth -= 1;
            }
            Component::ParentDir => return Err(outside("leaves the tool root")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(outside("absolute paths are not allowed"));
            }
        }
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::confine;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn confine_keeps_paths_under_the_root() {
        let root = Path::new("/srv/agent");
        assert_eq!(confine(root, ".").expect("dot"), root);
        assert_eq!(
            confine(root, "notes/./drafts/../final").expect("path"),
            Path::new("/srv/agent/notes/final")
        );
        assert!(confine(root, "notes/../../etc").is_err());
        assert!(confine(root, "/etc/passwd").is_err());
    }
}
