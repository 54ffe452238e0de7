// ABOUTME: The fixed remote setup sequence: runtime install through container launch.
// ABOUTME: Each step is a single remote invocation; order matters.

use std::collections::BTreeMap;

use crate::config::{EnvValue, Preset, resolve_env_map};
use crate::error::Result;

use super::error::BootstrapError;
use super::shell::RemoteShell;

struct Step {
    name: &'static str,
    command: String,
    /// Best-effort steps log a warning on failure instead of aborting.
    fatal: bool,
}

/// Render the `-e KEY='value'` flags for the container launch, resolving
/// every configured value against the process environment first.
///
/// Fails before any remote command executes when a value cannot be resolved.
pub fn build_env_flags(env: &BTreeMap<String, EnvValue>) -> Result<String> {
    let resolved = resolve_env_map(env)?;
    Ok(resolved
        .iter()
        .map(|(key, value)| format!("-e {}='{}'", key, value))
        .collect::<Vec<_>>()
        .join(" "))
}

fn steps(preset: &Preset, env_flags: &str) -> Vec<Step> {
    let image = preset.image.to_string();
    let container = preset.name.as_str();
    let port = preset.port;
    let env_flags = if env_flags.is_empty() {
        String::new()
    } else {
        format!("{env_flags} ")
    };

    vec![
        Step {
            name: "remove conflicting packages",
            command: "sudo apt-get remove -y docker docker-engine docker.io containerd runc \
                      || true"
                .to_string(),
            fatal: false,
        },
        Step {
            name: "install prerequisites",
            command: "sudo apt-get update -y && \
                      sudo apt-get install -y ca-certificates curl gnupg lsb-release"
                .to_string(),
            fatal: true,
        },
        Step {
            name: "import runtime trust key",
            command: "sudo mkdir -m 0755 -p /etc/apt/keyrings && \
                      curl -fsSL https://download.docker.com/linux/ubuntu/gpg | \
                      sudo gpg --dearmor -o /etc/apt/keyrings/docker.gpg"
                .to_string(),
            fatal: true,
        },
        Step {
            name: "register runtime repository",
            command: "echo \"deb [arch=$(dpkg --print-architecture) \
                      signed-by=/etc/apt/keyrings/docker.gpg] \
                      https://download.docker.com/linux/ubuntu \
                      $(lsb_release -cs) stable\" | \
                      sudo tee /etc/apt/sources.list.d/docker.list > /dev/null"
                .to_string(),
            fatal: true,
        },
        Step {
            name: "install runtime",
            command: "sudo apt-get update -y && \
                      sudo apt-get install -y docker-ce docker-ce-cli containerd.io \
                      docker-buildx-plugin docker-compose-plugin"
                .to_string(),
            fatal: true,
        },
        Step {
            name: "enable runtime service",
            command: "sudo systemctl enable --now docker".to_string(),
            fatal: true,
        },
        Step {
            name: "launch workload container",
            command: format!(
                "sudo docker pull {image} && \
                 sudo docker rm -f {container} || true && \
                 sudo docker run --gpus all -d -p {port}:{port} \
                 {env_flags}--name {container} {image}"
            ),
            fatal: true,
        },
    ]
}

/// Run the fixed setup sequence over an established shell.
pub async fn run_steps(
    shell: &dyn RemoteShell,
    preset: &Preset,
    env_flags: &str,
) -> std::result::Result<(), BootstrapError> {
    for step in steps(preset, env_flags) {
        tracing::info!("bootstrap: {}", step.name);

        let output = shell
            .exec(&step.command)
            .await
            .map_err(|source| BootstrapError::Shell {
                step: step.name,
                source,
            })?;

        if !output.success() {
            if step.fatal {
                return Err(BootstrapError::StepFailed {
                    step: step.name,
                    exit_code: output.exit_code,
                    diagnostic: output.diagnostic().to_string(),
                });
            }
            tracing::warn!(
                "bootstrap step '{}' failed ({}), continuing",
                step.name,
                output.diagnostic()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::ssh::CommandOutput;

    struct ScriptedShell {
        commands: Mutex<Vec<String>>,
        /// Exit code to return for the n-th command.
        exit_codes: Vec<u32>,
    }

    impl ScriptedShell {
        fn succeeding() -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                exit_codes: Vec::new(),
            }
        }

        fn with_exit_codes(exit_codes: Vec<u32>) -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                exit_codes,
            }
        }
    }

    #[async_trait]
    impl RemoteShell for ScriptedShell {
        async fn exec(&self, command: &str) -> crate::ssh::Result<CommandOutput> {
            let mut commands = self.commands.lock().unwrap();
            let index = commands.len();
            commands.push(command.to_string());
            let exit_code = self.exit_codes.get(index).copied().unwrap_or(0);
            Ok(CommandOutput {
                exit_code,
                stdout: String::new(),
                stderr: if exit_code == 0 {
                    String::new()
                } else {
                    "step exploded".to_string()
                },
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
    async fn runs_all_steps_in_order() {
        let shell = ScriptedShell::succeeding();
        run_steps(&shell, &preset(), "").await.unwrap();

        let commands = shell.commands.lock().unwrap();
        assert_eq!(commands.len(), 7);
        assert!(commands[0].contains("apt-get remove"));
        assert!(commands[1].contains("ca-certificates"));
        assert!(commands[2].contains("gpg --dearmor"));
        assert!(commands[3].contains("sources.list.d/docker.list"));
        assert!(commands[4].contains("docker-ce"));
        assert!(commands[5].contains("systemctl enable --now docker"));
        assert!(commands[6].contains("docker run --gpus all"));
        assert!(commands[6].contains("--name image-server"));
        assert!(commands[6].contains("-p 8080:8080"));
    }

    #[tokio::test]
    async fn conflicting_package_removal_is_best_effort() {
        // First step fails, everything else succeeds.
        let shell = ScriptedShell::with_exit_codes(vec![100]);
        run_steps(&shell, &preset(), "").await.unwrap();
        assert_eq!(shell.commands.lock().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn fatal_step_failure_stops_the_sequence() {
        let shell = ScriptedShell::with_exit_codes(vec![0, 1]);
        let err = run_steps(&shell, &preset(), "").await.unwrap_err();

        match err {
            BootstrapError::StepFailed {
                step,
                exit_code,
                diagnostic,
            } => {
                assert_eq!(step, "install prerequisites");
                assert_eq!(exit_code, 1);
                assert_eq!(diagnostic, "step exploded");
            }
            other => panic!("expected StepFailed, got {other:?}"),
        }
        // Nothing past the failed step ran.
        assert_eq!(shell.commands.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn env_flags_are_injected_into_the_run_command() {
        let shell = ScriptedShell::succeeding();
        run_steps(&shell, &preset(), "-e HF_TOKEN='secret'")
            .await
            .unwrap();

        let commands = shell.commands.lock().unwrap();
        assert!(commands[6].contains("-e HF_TOKEN='secret' --name image-server"));
    }

    #[test]
    fn env_flags_render_sorted_key_value_pairs() {
        temp_env::with_var("SKYLIFT_TEST_TOKEN", Some("secret"), || {
            let mut env = BTreeMap::new();
            env.insert(
                "HF_TOKEN".to_string(),
                EnvValue::Literal("${SKYLIFT_TEST_TOKEN}".to_string()),
            );
            env.insert(
                "LOG_LEVEL".to_string(),
                EnvValue::Literal("info".to_string()),
            );
            let flags = build_env_flags(&env).unwrap();
            assert_eq!(flags, "-e HF_TOKEN='secret' -e LOG_LEVEL='info'");
        });
    }

    #[test]
    fn env_flags_fail_fast_on_unresolved_values() {
        temp_env::with_var_unset("SKYLIFT_TEST_ABSENT", || {
            let mut env = BTreeMap::new();
            env.insert(
                "HF_TOKEN".to_string(),
                EnvValue::Literal("${SKYLIFT_TEST_ABSENT}".to_string()),
            );
            assert!(build_env_flags(&env).is_err());
        });
    }
}
