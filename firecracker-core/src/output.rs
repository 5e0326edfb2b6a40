//! Atomic output: write to a sibling `<name>~` file, then rename over
//! the final name on success, so a reader never observes a partially
//! written result. Standard-output mode has no such guarantee to make —
//! there is no file to rename.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    /// Writes `contents` to this sink, atomically in the `File` case.
    pub fn write_all(&self, contents: &str) -> Result<(), EngineError> {
        match self {
            Sink::Stdout => {
                std::io::stdout().write_all(contents.as_bytes()).map_err(|source| EngineError::Output {
                    path: PathBuf::from("<stdout>"),
                    source,
                })
            }
            Sink::File(path) => write_atomic(path, contents),
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), EngineError> {
    let tmp_path = sibling_tmp_path(path);

    let write_result = (|| -> std::io::Result<()> {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(contents.as_bytes())?;
        f.sync_all()?;
        Ok(())
    })();

    write_result.map_err(|source| EngineError::Output {
        path: tmp_path.clone(),
        source,
    })?;

    std::fs::rename(&tmp_path, path).map_err(|source| EngineError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}
