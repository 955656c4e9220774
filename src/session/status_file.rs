use chrono::Utc;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Periodically dump the status registry as pretty JSON to `path`.
pub fn spawn_status_writer(path: PathBuf, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create status file directory");
        }

        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(error) = tokio::fs::write(&path, render()).await {
                tracing::warn!(%error, path = %path.display(), "failed to write status file");
            }
        }
    })
}

fn render() -> Vec<u8> {
    let mut json = crate::diagnostics::snapshot_json();
    if let Some(fields) = json.as_object_mut() {
        fields.insert(
            "written_at".into(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );
    }
    serde_json::to_vec_pretty(&json).unwrap_or_else(|_| b"{}".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_snapshot_with_timestamp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("status.json");

        let handle = spawn_status_writer(path.clone(), Duration::from_millis(20));
        let mut written = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Ok(data) = tokio::fs::read(&path).await
                && let Ok(value) = serde_json::from_slice::<serde_json::Value>(&data)
            {
                written = Some(value);
                break;
            }
        }
        handle.abort();

        let json = written.expect("status file written");
        assert!(json.get("written_at").and_then(|v| v.as_str()).is_some());
        assert!(json.pointer("/link/state").is_some_and(serde_json::Value::is_string));
        assert!(json.pointer("/session/faults").is_some_and(serde_json::Value::is_u64));
        assert!(json.get("pid").is_some());
    }
}
