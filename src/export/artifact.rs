use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const MARKDOWN_MIME: &str = "text/markdown";

/// A named text document ready to hand to a download collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub filename: String,
    pub mime: &'static str,
    pub body: String,
}

impl Artifact {
    pub fn markdown(filename: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mime: MARKDOWN_MIME,
            body: body.into(),
        }
    }
}

/// `Agent Platform` + `Design_Spec` -> `Agent_Platform_Design_Spec.md`.
pub fn artifact_filename(system: &str, kind: &str) -> String {
    let stem: String = system
        .trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '\t' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect();
    if stem.is_empty() {
        format!("{kind}.md")
    } else {
        format!("{stem}_{kind}.md")
    }
}

pub trait ArtifactSink {
    fn deliver(&mut self, artifact: &Artifact) -> anyhow::Result<()>;
}

/// Writes each artifact as a file under one directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: &Artifact) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(&artifact.filename);
        std::fs::write(&path, &artifact.body)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), mime = artifact.mime, bytes = artifact.body.len(), "artifact written");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: &Artifact) -> anyhow::Result<()> {
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_replace_spaces() {
        assert_eq!(
            artifact_filename("Agent Platform", "Design_Spec"),
            "Agent_Platform_Design_Spec.md"
        );
        assert_eq!(artifact_filename("a/b", "Generation_Skill"), "a-b_Generation_Skill.md");
        assert_eq!(artifact_filename("  ", "Design_Spec"), "Design_Spec.md");
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = std::env::temp_dir().join(format!("archd-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&dir);
        sink.deliver(&Artifact::markdown("Test_Design_Spec.md", "# hi\n"))
            .unwrap();
        let written = &sink.written()[0];
        assert_eq!(std::fs::read_to_string(written).unwrap(), "# hi\n");
        std::fs::remove_dir_all(&dir).ok();
    }
}
