use anyhow::{Context, Result, anyhow};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::DramaArtifacts;

// @module: File and directory utilities

// @struct: Output locations for one rendered script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub audio: PathBuf,
    pub subtitles: PathBuf,
    pub timeline: PathBuf,
    pub cast: PathBuf,
    // @field: Only set when WebVTT output is requested
    pub vtt: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Paths named after `stem` inside `output_dir`
    pub fn new<P: AsRef<Path>>(output_dir: P, stem: &str, with_vtt: bool) -> Self {
        let dir = output_dir.as_ref();
        Self {
            audio: dir.join(format!("{}.wav", stem)),
            subtitles: dir.join(format!("{}.srt", stem)),
            timeline: dir.join(format!("{}.timeline.json", stem)),
            cast: dir.join(format!("{}.cast.json", stem)),
            vtt: with_vtt.then(|| dir.join(format!("{}.vtt", stem))),
        }
    }

    pub fn all(&self) -> Vec<&Path> {
        let mut paths = vec![
            self.audio.as_path(),
            self.subtitles.as_path(),
            self.timeline.as_path(),
            self.cast.as_path(),
        ];
        if let Some(vtt) = &self.vtt {
            paths.push(vtt.as_path());
        }
        paths
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    // @generates: Artifact stem from the script file name
    pub fn output_stem<P: AsRef<Path>>(script_path: P) -> String {
        script_path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "drama".to_string())
    }

    /// Write every artifact of a run; refuses to replace existing files unless `force`
    pub fn write_artifacts(artifacts: &DramaArtifacts, paths: &ArtifactPaths, force: bool) -> Result<()> {
        if !force {
            if let Some(existing) = paths.all().into_iter().find(|p| p.exists()) {
                return Err(anyhow!(
                    "Output file already exists: {:?}. Use -f to force overwrite.",
                    existing
                ));
            }
        }

        if let Some(parent) = paths.audio.parent() {
            Self::ensure_dir(parent)?;
        }

        artifacts
            .audio
            .write_wav(&paths.audio)
            .with_context(|| format!("Failed to write audio: {:?}", paths.audio))?;
        Self::write_to_file(&paths.subtitles, &artifacts.srt())?;

        let timeline = serde_json::to_string_pretty(&artifacts.timeline).context("Failed to serialize timeline")?;
        Self::write_to_file(&paths.timeline, &timeline)?;

        let cast = serde_json::to_string_pretty(&artifacts.cast).context("Failed to serialize cast")?;
        Self::write_to_file(&paths.cast, &cast)?;

        if let Some(vtt) = &paths.vtt {
            Self::write_to_file(vtt, &artifacts.subtitles.to_vtt())?;
        }

        info!("Success: {:?}", paths.audio);
        Ok(())
    }

    /// Write artifacts from async code; encoding and file IO run on the blocking pool.
    /// The artifacts are handed back once written.
    pub async fn save_artifacts(artifacts: DramaArtifacts, paths: ArtifactPaths, force: bool) -> Result<DramaArtifacts> {
        tokio::task::spawn_blocking(move || {
            Self::write_artifacts(&artifacts, &paths, force)?;
            Ok(artifacts)
        })
        .await
        .context("Artifact writer task failed")?
    }
}
