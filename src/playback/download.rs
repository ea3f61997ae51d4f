//! Song downloads into the local songs directory.
//!
//! [`HttpDownloader`] streams an asset chunk by chunk into
//! `<songs_dir>/<song_id>.mp3.part` and renames it once the body is
//! complete, so a half-written file never carries the final name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::config::PlaybackConfig;

use super::PlaybackError;

/// Stable on-disk location of a song: `<songs_dir>/<song_id>.mp3`.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so a remote id
/// can never escape `songs_dir`.
pub fn song_path(songs_dir: &Path, song_id: &str) -> PathBuf {
    let mut name: String = song_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.trim_matches('.').is_empty() {
        name = "song".into();
    }
    songs_dir.join(format!("{name}.mp3"))
}

/// Downloads finished songs over HTTP.
#[derive(Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    songs_dir: PathBuf,
}

impl HttpDownloader {
    /// Build a downloader from playback config.
    ///
    /// Only the connect phase has a timeout: a live stream download lasts as
    /// long as the song itself.
    pub fn from_config(config: &PlaybackConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.download_connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            songs_dir: config.songs_dir.clone(),
        }
    }

    /// Directory songs are written to.
    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    /// Fetch `audio_url` and persist it as `song_path(songs_dir, song_id)`.
    pub async fn download(&self, audio_url: &str, song_id: &str) -> Result<PathBuf, PlaybackError> {
        tokio::fs::create_dir_all(&self.songs_dir).await?;

        let target = song_path(&self.songs_dir, song_id);
        let partial = target.with_extension("mp3.part");

        let mut response = self.client.get(audio_url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written: u64 = 0;
        let body = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<_, PlaybackError>(())
        };

        if let Err(e) = body.await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        drop(file);

        tokio::fs::rename(&partial, &target).await?;
        log::info!(
            "download: saved {} ({} bytes)",
            target.display(),
            written
        );
        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tempfile::tempdir;

    async fn spawn_asset_server() -> String {
        let app = Router::new()
            .route("/42.mp3", get(|| async { vec![7u8; 4096] }))
            .route("/gone.mp3", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn downloader_in(dir: &Path) -> HttpDownloader {
        HttpDownloader::from_config(&PlaybackConfig {
            songs_dir: dir.join("saved_songs"),
            ..PlaybackConfig::default()
        })
    }

    #[test]
    fn song_path_is_keyed_by_song_id() {
        assert_eq!(
            song_path(Path::new("saved_songs"), "42"),
            PathBuf::from("saved_songs/42.mp3")
        );
    }

    #[test]
    fn song_path_cannot_escape_songs_dir() {
        let path = song_path(Path::new("saved_songs"), "../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("saved_songs")));
        assert_eq!(song_path(Path::new("s"), ".."), PathBuf::from("s/song.mp3"));
    }

    #[tokio::test]
    async fn download_writes_song_file() {
        let dir = tempdir().unwrap();
        let base = spawn_asset_server().await;
        let downloader = downloader_in(dir.path());

        let path = downloader
            .download(&format!("{base}/42.mp3"), "42")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("saved_songs").join("42.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 4096]);
        assert!(!path.with_extension("mp3.part").exists());
    }

    #[tokio::test]
    async fn http_error_leaves_no_file() {
        let dir = tempdir().unwrap();
        let base = spawn_asset_server().await;
        let downloader = downloader_in(dir.path());

        let err = downloader
            .download(&format!("{base}/gone.mp3"), "gone")
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackError::Download(_)));
        assert!(!song_path(downloader.songs_dir(), "gone").exists());
    }
}
