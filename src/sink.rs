use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::HarvestError;

/// Append-only ndjson writer shared by concurrent callers.
///
/// The file is opened lazily in append mode on the first write and kept
/// open for the lifetime of the sink. Every line is encoded before the lock
/// is taken and written with a single `write_all` while holding it, so two
/// records can never interleave or truncate each other.
#[derive(Debug)]
pub struct AppendSink {
    path: Utf8PathBuf,
    file: Mutex<Option<OpenFile>>,
}

/// Open handle plus the length of the file up to the last complete line.
#[derive(Debug)]
struct OpenFile {
    file: File,
    len: u64,
}

impl AppendSink {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// A failed write is rolled back to the last complete line and the
    /// handle is dropped, so the next append reopens the file.
    pub async fn append<T: Serialize + ?Sized>(&self, document: &T) -> Result<(), HarvestError> {
        let line = encode_line(document)?;

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        let Some(open) = guard.as_mut() else {
            return Err(HarvestError::io(&self.path, "file handle unavailable"));
        };

        let written = async {
            open.file.write_all(&line).await?;
            open.file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                open.len += line.len() as u64;
                Ok(())
            }
            Err(err) => {
                if let Err(trim) = truncate_to(&mut open.file, open.len).await {
                    warn!(path = %self.path, error = %trim, "could not roll back partial line");
                }
                *guard = None;
                Err(HarvestError::io(&self.path, err))
            }
        }
    }

    async fn open(&self) -> Result<OpenFile, HarvestError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .await
            .map_err(|err| HarvestError::io(&self.path, err))?;
        let len = file
            .metadata()
            .await
            .map_err(|err| HarvestError::io(&self.path, err))?
            .len();
        Ok(OpenFile { file, len })
    }
}

async fn truncate_to(file: &mut File, len: u64) -> std::io::Result<()> {
    file.flush().await?;
    file.set_len(len).await
}

/// Compact JSON plus the terminating newline. Newlines inside strings are
/// escaped by the encoder, so the result is always exactly one line.
pub fn encode_line<T: Serialize + ?Sized>(document: &T) -> Result<Vec<u8>, HarvestError> {
    let mut line =
        serde_json::to_vec(document).map_err(|err| HarvestError::Encode(err.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encoded_line_is_compact_and_single() {
        let line = encode_line(&json!({"id": "a", "note": "two\nlines"})).unwrap();
        let text = String::from_utf8(line).unwrap();
        assert_eq!(text, "{\"id\":\"a\",\"note\":\"two\\nlines\"}\n");
        assert_eq!(text.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn truncate_drops_partial_line_and_append_resumes_at_end() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("partial.json");
        std::fs::write(&path, "{\"id\":\"a\"}\n").unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(b"{\"id\":\"b\",\"pad").await.unwrap();
        truncate_to(&mut file, 11).await.unwrap();
        file.write_all(b"{\"id\":\"c\"}\n").await.unwrap();
        file.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"id\":\"a\"}\n{\"id\":\"c\"}\n");
    }
}
