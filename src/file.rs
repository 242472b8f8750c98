//! File and directory manipulation utilities.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, io::Error> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Writes `value` to a given file `path` as pretty-printed JSON, replacing any existing file.
pub fn write_json<S: Serialize + ?Sized>(path: impl AsRef<Path>, value: &S) -> Result<(), io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error> {
        read_json(path)
    }
}

pub trait WriteJsonFile {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), io::Error>;
}

impl<S: Serialize> WriteJsonFile for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        write_json(path, self)
    }
}

/// Lists the files directly within `dir` whose extension is `extension`, sorted by path.
pub fn list_files(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>, io::Error> {
    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension() == Some(OsStr::new(extension)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Moves the directory `source` to `target`, replacing whatever is at `target`. Falls back to a
/// recursive copy when the two are on different filesystems.
pub fn replace_dir(source: &Path, target: &Path) -> Result<(), io::Error> {
    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(source, target).is_err() {
        copy_dir(source, target)?;
        fs::remove_dir_all(source)?;
    }
    Ok(())
}

fn copy_dir(source: &Path, target: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), destination)?;
        }
    }
    Ok(())
}
