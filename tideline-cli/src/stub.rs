//! Migration stub generation for `tideline create`

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the CLI itself rather than the engine.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid migration name '{0}': use a letter or underscore followed by letters, digits or underscores")]
    InvalidName(String),

    #[error("migration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Filesystem access used by stub creation.
pub trait FileWriter {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Write `contents` to a file that must not exist yet.
    ///
    /// Returns an `AlreadyExists` error instead of overwriting.
    fn write_new(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// [`FileWriter`] over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFileWriter;

impl FileWriter for FsFileWriter {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn write_new(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(contents.as_bytes())
    }
}

/// Same shape as the name part of a migration identifier.
static NAME_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").ok());

/// Unix time in milliseconds; 13 digits for any date this tool will see.
#[must_use]
pub fn current_version() -> i64 {
    Utc::now().timestamp_millis()
}

/// Check a migration name before anything is written.
///
/// # Errors
///
/// Returns `CliError::InvalidName` if the name could not be parsed back out of
/// the generated struct name.
pub fn validate_name(name: &str) -> Result<(), CliError> {
    if NAME_PATTERN.as_ref().is_some_and(|re| re.is_match(name)) {
        Ok(())
    } else {
        Err(CliError::InvalidName(name.to_string()))
    }
}

/// `CreateUsersTable` -> `create_users_table`
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_numeric();
        }
    }
    out
}

#[must_use]
pub fn stub_file_name(version: i64, name: &str) -> String {
    format!("m{version}_{}.rs", to_snake_case(name))
}

#[must_use]
pub fn stub_source(version: i64, name: &str) -> String {
    let type_name = format!("Migration{version}{name}");
    let allow = if name.contains('_') || name.starts_with(|c: char| c.is_lowercase()) {
        "#[allow(non_camel_case_types)]\n"
    } else {
        ""
    };
    format!(
        r#"//! Migration: {name}
//! Version: {version}
//! Generated: {generated}

use tideline::migration::{{Migration, RunStatus, SchemaManager}};
use tideline::TideError;

{allow}pub struct {type_name};

impl Migration for {type_name} {{
    fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {{
        Err(TideError::Other("{type_name}::up is not implemented".to_string()))
    }}

    fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {{
        Err(TideError::Other("{type_name}::down is not implemented".to_string()))
    }}
}}
"#,
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Write a new migration stub into `dir`.
///
/// # Errors
///
/// `InvalidName` for a bad name, `AlreadyExists` if the target file is
/// present, `Write` for any other I/O failure.
pub fn create_stub(
    writer: &dyn FileWriter,
    dir: &Path,
    name: &str,
    version: i64,
) -> Result<PathBuf, CliError> {
    validate_name(name)?;

    writer.create_dir_all(dir).map_err(|source| CliError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(stub_file_name(version, name));
    match writer.write_new(&path, &stub_source(version, name)) {
        Ok(()) => {
            log::debug!("wrote {}", path.display());
            Ok(path)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(CliError::AlreadyExists(path)),
        Err(source) => Err(CliError::Write { path, source }),
    }
}
