//! Command-specific tests and shared helpers.

mod bulk_test;
mod lifecycle_test;
mod query_test;

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch workspace with an asset root at `<tmp>/plugins`.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("plugins")).unwrap();
        Self { tmp }
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("plugins")
    }

    /// Write `<root>/<name>.toml`.
    pub fn asset(&self, name: &str, depends: &[&str]) -> &Self {
        let depends = depends
            .iter()
            .map(|d| format!("\"{}\"", d))
            .collect::<Vec<_>>()
            .join(", ");
        std::fs::write(
            self.root().join(format!("{}.toml", name)),
            format!("version = \"0.3.1\"\ndepends = [{}]\n", depends),
        )
        .unwrap();
        self
    }

    /// `plugdeck --root <root>` running inside the scratch directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("plugdeck").unwrap();
        cmd.current_dir(self.tmp.path())
            .env_remove("PLUGDECK_ROOT")
            .env_remove("PLUGDECK_KIND")
            .env_remove("PLUGDECK_STATE_FILE")
            .env_remove("PLUGDECK_HOOK_TIMEOUT_SECS")
            .arg("--root")
            .arg(self.root());
        cmd
    }

    /// Hook names recorded for `name`, in call order.
    pub fn hooks(&self, name: &str) -> Vec<String> {
        hooks_in(&self.root(), name)
    }
}

fn hooks_in(root: &Path, name: &str) -> Vec<String> {
    let path = root.join(name).join("data").join("hooks.log");
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1).map(str::to_string))
        .collect()
}
