// ABOUTME: Container image build invocation.
// ABOUTME: Builds from a resolved context directory with one or more repo:tag labels.

use std::path::Path;
use thiserror::Error;

use crate::config::Preset;

use super::{CommandExecutor, CommandOutput, ExecError};

/// An image build failed. Preserves the captured streams of the underlying
/// execution for diagnostics.
#[derive(Debug, Error)]
#[error("image build for preset '{preset}' failed: {source}")]
pub struct ImageBuildError {
    pub preset: String,
    #[source]
    pub source: ExecError,
}

/// Builds the workload image with the local container tooling.
pub struct ImageBuilder<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Build the image from `context`, labeling it with `tags`.
    /// With no tags supplied, `<namespace>/<preset>:latest` is applied.
    pub async fn build(
        &self,
        preset: &Preset,
        context: &Path,
        tags: &[String],
    ) -> Result<CommandOutput, ImageBuildError> {
        let default_tag;
        let tags: &[String] = if tags.is_empty() {
            default_tag = [preset.default_build_tag()];
            &default_tag
        } else {
            tags
        };

        let mut argv = vec!["docker".to_string(), "build".to_string()];
        for tag in tags {
            argv.push("-t".to_string());
            argv.push(tag.clone());
        }
        argv.push(".".to_string());

        tracing::info!(
            "building image for preset '{}' from {}",
            preset.name,
            context.display()
        );

        self.executor
            .run(&argv, context)
            .await
            .map_err(|source| ImageBuildError {
                preset: preset.name.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingExecutor(Mutex<Vec<Vec<String>>>);

    #[async_trait]
    impl CommandExecutor for RecordingExecutor {
        async fn run(&self, argv: &[String], _workdir: &Path) -> Result<CommandOutput, ExecError> {
            self.0.lock().unwrap().push(argv.to_vec());
            Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn preset() -> Preset {
        Preset::from_yaml(
            "image-server",
            r#"
instance_type: gpu_1x_a100
image: ghcr.io/org/image-server:latest
port: 8080
health_path: /health
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn default_tag_is_namespace_preset_latest() {
        let executor = RecordingExecutor(Mutex::new(Vec::new()));
        let builder = ImageBuilder::new(&executor);

        builder
            .build(&preset(), Path::new("/ctx"), &[])
            .await
            .unwrap();

        let calls = executor.0.lock().unwrap();
        assert_eq!(
            calls[0],
            ["docker", "build", "-t", "skylift/image-server:latest", "."]
        );
    }

    #[tokio::test]
    async fn explicit_tags_are_all_applied() {
        let executor = RecordingExecutor(Mutex::new(Vec::new()));
        let builder = ImageBuilder::new(&executor);

        let tags = vec!["org/app:v1".to_string(), "org/app:latest".to_string()];
        builder
            .build(&preset(), Path::new("/ctx"), &tags)
            .await
            .unwrap();

        let calls = executor.0.lock().unwrap();
        assert_eq!(
            calls[0],
            [
                "docker", "build", "-t", "org/app:v1", "-t", "org/app:latest", "."
            ]
        );
    }
}
