//! The `import` command: move media files into the repository.

use std::path::Path;
use std::process::ExitCode;

use reelvault_repo::Repo;

use crate::error::CliError;

pub(crate) fn run(repository: &Path, path: &Path) -> Result<ExitCode, CliError> {
    let mut repo = Repo::open(repository)?;
    let imported = repo.import(path)?;
    println!("Imported {imported} file(s).");
    Ok(ExitCode::SUCCESS)
}
