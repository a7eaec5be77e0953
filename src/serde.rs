use std::path::Path;

use bincode::config::{standard, Configuration};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io};

use crate::{error::Result, file::ensure_parent};

pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let bytes = bincode::serde::encode_to_vec(value, bincode_config())?;
    Ok(bytes)
}

pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode_config())?;
    Ok(value)
}

fn bincode_config() -> Configuration {
    standard()
}

/// Reads a JSON state file, returning `None` when it does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

/// Writes to a sibling temp file and renames it over `path`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;

    let mut temp_name = path.file_name().unwrap_or_default().to_owned();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, bytes).await?;
    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err.into());
    }

    Ok(())
}
