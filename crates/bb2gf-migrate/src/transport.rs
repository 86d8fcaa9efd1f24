//! Mirror transfer of repositories with `git` and `git lfs`.
//!
//! Mirror clone and mirror push are all-or-nothing and return errors.
//! Large-file operations are best-effort: they report an [`LfsOutcome`]
//! instead of failing, since a missing LFS payload does not corrupt the
//! mirrored refs.

use crate::command::CommandRunner;
use crate::error::Result;

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of a best-effort large-file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LfsOutcome {
    /// All large-file objects were transferred.
    Transferred,
    /// The transfer did not happen; `reason` is masked diagnostic text.
    Unavailable {
        /// Why the transfer failed.
        reason: String,
    },
}

impl LfsOutcome {
    /// Whether the transfer succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Transferred)
    }
}

/// Operations the migration pipeline needs on a local mirror.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Full mirror clone of `source_url` into `destination`.
    async fn clone_mirror(&self, source_url: &str, destination: &Path) -> Result<()>;

    /// Fetch every large-file object reachable from any ref.
    async fn fetch_all_lfs(&self, repo: &Path) -> LfsOutcome;

    /// Whether the bare repository references or stores large-file objects.
    /// Never fails; any error means "no content".
    async fn has_lfs_content(&self, repo: &Path) -> bool;

    /// Point `name` at `url`, replacing an existing remote of that name.
    async fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()>;

    /// Push every ref to `remote`.
    async fn push_mirror(&self, repo: &Path, remote: &str) -> Result<()>;

    /// Push every large-file object to `remote`.
    async fn push_all_lfs(&self, repo: &Path, remote: &str) -> LfsOutcome;
}

/// [`MirrorTransport`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitTransport {
    runner: CommandRunner,
    source_ssl_no_verify: bool,
}

impl GitTransport {
    /// Create a transport using `runner` for every git invocation.
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            source_ssl_no_verify: false,
        }
    }

    /// Skip TLS verification for source-side operations (clone, LFS fetch).
    pub fn with_source_ssl_no_verify(mut self, skip: bool) -> Self {
        self.source_ssl_no_verify = skip;
        self
    }

    fn source_env(&self) -> Vec<(&'static str, &'static str)> {
        if self.source_ssl_no_verify {
            vec![("GIT_SSL_NO_VERIFY", "true")]
        } else {
            Vec::new()
        }
    }

    async fn has_lfs_files_listed(&self, repo: &Path) -> bool {
        let git_dir = repo.to_string_lossy();
        match self
            .runner
            .run("git", &["lfs", "ls-files", "--all"], None, &[("GIT_DIR", &*git_dir)])
            .await
        {
            Ok(out) => !out.trim().is_empty(),
            Err(e) => {
                debug!(repo = %repo.display(), error = %e, "git lfs ls-files unavailable");
                false
            }
        }
    }
}

/// Whether `repo/lfs/objects` holds at least one file.
pub fn lfs_objects_present(repo: &Path) -> bool {
    let objects = repo.join("lfs").join("objects");
    WalkDir::new(objects)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_type().is_file())
}

#[async_trait]
impl MirrorTransport for GitTransport {
    async fn clone_mirror(&self, source_url: &str, destination: &Path) -> Result<()> {
        let destination = destination.to_string_lossy();
        self.runner
            .run(
                "git",
                &["clone", "--mirror", source_url, &*destination],
                None,
                &self.source_env(),
            )
            .await
            .map(|_| ())
    }

    async fn fetch_all_lfs(&self, repo: &Path) -> LfsOutcome {
        match self
            .runner
            .run("git", &["lfs", "fetch", "--all"], Some(repo), &self.source_env())
            .await
        {
            Ok(_) => LfsOutcome::Transferred,
            Err(e) => {
                warn!(repo = %repo.display(), error = %e, "git lfs fetch failed");
                LfsOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn has_lfs_content(&self, repo: &Path) -> bool {
        self.has_lfs_files_listed(repo).await || lfs_objects_present(repo)
    }

    async fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()> {
        if let Err(e) = self
            .runner
            .run("git", &["remote", "remove", name], Some(repo), &[])
            .await
        {
            debug!(remote = name, error = %e, "No existing remote to remove");
        }
        self.runner
            .run("git", &["remote", "add", name, url], Some(repo), &[])
            .await
            .map(|_| ())
    }

    async fn push_mirror(&self, repo: &Path, remote: &str) -> Result<()> {
        self.runner
            .run("git", &["push", "--mirror", remote], Some(repo), &[])
            .await
            .map(|_| ())
    }

    async fn push_all_lfs(&self, repo: &Path, remote: &str) -> LfsOutcome {
        match self
            .runner
            .run("git", &["lfs", "push", "--all", remote], Some(repo), &[])
            .await
        {
            Ok(_) => LfsOutcome::Transferred,
            Err(e) => {
                warn!(repo = %repo.display(), remote, error = %e, "git lfs push failed");
                LfsOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lfs_objects_present_scans_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("lfs").join("objects").join("ab").join("cd");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(!lfs_objects_present(dir.path()));

        std::fs::write(nested.join("abcd1234"), b"payload").unwrap();
        assert!(lfs_objects_present(dir.path()));
    }

    #[test]
    fn test_lfs_objects_present_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(!lfs_objects_present(&dir.path().join("nope.git")));
    }

    #[tokio::test]
    async fn test_has_lfs_content_falls_back_to_filesystem() {
        // Not a git repository: the listing fails and the scan decides.
        let dir = TempDir::new().unwrap();
        let transport = GitTransport::default();
        assert!(!transport.has_lfs_content(dir.path()).await);

        let objects = dir.path().join("lfs").join("objects").join("0a");
        std::fs::create_dir_all(&objects).unwrap();
        std::fs::write(objects.join("0a1b"), b"x").unwrap();
        assert!(transport.has_lfs_content(dir.path()).await);
    }

    #[tokio::test]
    async fn test_lfs_fetch_outside_repository_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let transport = GitTransport::default();
        let outcome = transport.fetch_all_lfs(&dir.path().join("missing.git")).await;
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_source_env_toggles_ssl_verification() {
        let transport = GitTransport::default();
        assert!(transport.source_env().is_empty());
        let transport = transport.with_source_ssl_no_verify(true);
        assert_eq!(transport.source_env(), vec![("GIT_SSL_NO_VERIFY", "true")]);
    }

    #[cfg(unix)]
    fn git(cwd: &Path, args: &[&str]) -> String {
        let out = std::process::Command::new("git")
            .args(["-c", "user.name=bb2gf", "-c", "user.email=bb2gf@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
            .args(args)
            .current_dir(cwd)
            .output()
            .unwrap();
        assert!(
            out.status.success(),
            "git {args:?}: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    /// A bare repository holding one commit on `main`, and its commit id.
    #[cfg(unix)]
    fn seeded_bare_repo(root: &Path) -> (std::path::PathBuf, String) {
        let bare = root.join("source.git");
        let work = root.join("work");
        std::fs::create_dir_all(&work).unwrap();
        git(root, &["init", "--bare", bare.to_str().unwrap()]);
        git(&work, &["init"]);
        std::fs::write(work.join("README.md"), "hello\n").unwrap();
        git(&work, &["add", "README.md"]);
        git(&work, &["commit", "-m", "initial"]);
        git(&work, &["push", bare.to_str().unwrap(), "HEAD:refs/heads/main"]);
        let head = git(&work, &["rev-parse", "HEAD"]);
        (bare, head)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_mirror_round_trip() {
        let dir = TempDir::new().unwrap();
        let (source, head) = seeded_bare_repo(dir.path());
        let destination = dir.path().join("destination.git");
        git(dir.path(), &["init", "--bare", destination.to_str().unwrap()]);

        let transport = GitTransport::default();
        let mirror = dir.path().join("mirror.git");
        transport
            .clone_mirror(source.to_str().unwrap(), &mirror)
            .await
            .unwrap();
        assert_eq!(git(&mirror, &["rev-parse", "refs/heads/main"]), head);

        // Re-adding the remote replaces the previous URL.
        let stale = dir.path().join("elsewhere.git");
        transport
            .add_remote(&mirror, "gitflic", stale.to_str().unwrap())
            .await
            .unwrap();
        transport
            .add_remote(&mirror, "gitflic", destination.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(
            git(&mirror, &["remote", "get-url", "gitflic"]),
            destination.to_str().unwrap()
        );

        transport.push_mirror(&mirror, "gitflic").await.unwrap();
        assert_eq!(git(&destination, &["rev-parse", "refs/heads/main"]), head);
        assert!(!transport.has_lfs_content(&mirror).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_push_to_missing_remote_fails() {
        let dir = TempDir::new().unwrap();
        let (source, _) = seeded_bare_repo(dir.path());
        let transport = GitTransport::default();
        let mirror = dir.path().join("mirror.git");
        transport
            .clone_mirror(source.to_str().unwrap(), &mirror)
            .await
            .unwrap();

        let missing = dir.path().join("missing.git");
        transport
            .add_remote(&mirror, "gitflic", missing.to_str().unwrap())
            .await
            .unwrap();
        assert!(transport.push_mirror(&mirror, "gitflic").await.is_err());
    }

    #[tokio::test]
    #[ignore] // requires git and network access
    async fn test_clone_mirror_public_repository() {
        let dir = TempDir::new().unwrap();
        let transport = GitTransport::default();
        transport
            .clone_mirror(
                "https://github.com/octocat/Hello-World.git",
                &dir.path().join("hello.git"),
            )
            .await
            .unwrap();
        assert!(dir.path().join("hello.git").join("HEAD").exists());
    }
}
