//! Shared atomic-write helper. Every JSON artifact and every piece of
//! persisted state is written temp-file-then-rename, in the same directory
//! as the target, so a reader never observes a partial write (spec §5).

use std::path::Path;

use serde::Serialize;

pub async fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));

    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Serialize `value` as compact JSON with lexicographically sorted keys
/// and write it atomically.
pub async fn atomic_write_json_sorted<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), std::io::Error> {
    let raw = serde_json::to_value(value).map_err(std::io::Error::other)?;
    let sorted = sort_json_keys(raw);
    let bytes = serde_json::to_vec(&sorted).map_err(std::io::Error::other)?;
    atomic_write_bytes(path, &bytes).await
}

/// Serialize `value` as pretty JSON (used for state files read by humans
/// during incident response; artifacts destined for the site use the
/// sorted/compact variant above).
pub async fn atomic_write_json_pretty<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), std::io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    atomic_write_bytes(path, json.as_bytes()).await
}

fn sort_json_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_json_keys(map[key].clone()));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_json_keys).collect())
        }
        other => other,
    }
}

pub async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, std::io::Error> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(std::io::Error::other)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        b: u32,
        a: u32,
    }

    #[tokio::test]
    async fn round_trips_and_sorts_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample { b: 2, a: 1 };
        atomic_write_json_sorted(&path, &value).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.find("\"a\"").unwrap() < raw.find("\"b\"").unwrap());

        let back: Sample = read_json(&path).await.unwrap().unwrap();
        assert_eq!(back, value);
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let back: Option<Sample> = read_json(&path).await.unwrap();
        assert!(back.is_none());
    }
}
