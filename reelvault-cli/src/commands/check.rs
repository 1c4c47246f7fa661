//! The `check` command: exhaustive repository integrity check.

use std::path::Path;
use std::process::ExitCode;

use reelvault_repo::Repo;

use crate::error::CliError;

pub(crate) fn run(repository: &Path) -> Result<ExitCode, CliError> {
    let mut repo = Repo::open(repository)?;
    let issues = repo.check_integrity()?;

    if issues.is_empty() {
        println!("Repository is healthy.");
        return Ok(ExitCode::SUCCESS);
    }

    for issue in &issues {
        println!("{issue}");
    }
    println!("{} problem(s) found.", issues.len());
    Ok(ExitCode::FAILURE)
}
