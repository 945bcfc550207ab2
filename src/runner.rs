use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Run a command and capture output
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

/// Name of the branch checked out in the git repository at `repo`
pub fn current_branch(repo: &Path) -> Result<String> {
    let repo = repo.to_string_lossy();
    run_capture("git", &["-C", &repo, "rev-parse", "--abbrev-ref", "HEAD"])
        .with_context(|| format!("Could not read the current branch of {repo}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_capture_trims_output() {
        assert_eq!(run_capture("echo", &["  master  "]).unwrap(), "master");
    }

    #[test]
    fn test_run_capture_failure() {
        assert!(run_capture("false", &[]).is_err());
    }

    #[test]
    fn test_current_branch_outside_repo() {
        let dir = TempDir::new().unwrap();
        assert!(current_branch(&dir.path().join("missing")).is_err());
    }
}
