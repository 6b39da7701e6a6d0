//! CLI subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use callmodel_core::{CallModelConfig, Dispatcher, MockRuntime};
use tracing::info;

use crate::{Commands, ConfigAction, RunOptions};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    options: &RunOptions,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace).await,
        Commands::Invoke {
            model,
            prompt,
            json,
        } => {
            let config = load(workspace)?;
            crate::repl::run_single(config, options, &model, &prompt, json).await
        }
        Commands::Serve { host, port } => {
            let mut config = load(workspace)?;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            handle_serve(config, options).await
        }
    }
}

fn load(workspace: &Path) -> anyhow::Result<CallModelConfig> {
    let config = callmodel_core::config::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config.validate()?;
    Ok(config)
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".callmodel");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&CallModelConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = callmodel_core::config::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn handle_serve(config: CallModelConfig, options: &RunOptions) -> anyhow::Result<()> {
    if options.gateway.is_some() {
        anyhow::bail!("--gateway cannot be combined with serve");
    }
    let dispatcher = if options.offline {
        Dispatcher::with_runtime(&config, Arc::new(MockRuntime::new()))
    } else {
        Dispatcher::from_config(&config)
    };
    info!(
        addr = config.gateway.bind_addr().as_str(),
        bucket = config.store.bucket.as_str(),
        offline = options.offline,
        "Starting gateway"
    );
    println!("Gateway listening on http://{}", config.gateway.bind_addr());

    let shared = callmodel_core::gateway::shared(dispatcher);
    callmodel_core::run_gateway(shared, &config.gateway).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, &RunOptions::default())
            .await
            .unwrap();

        let config_path = workspace.join(".callmodel").join("config.toml");
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: CallModelConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.store.bucket, "bedrock-agent-images");
        assert_eq!(parsed.gateway.port, 8787);
    }

    #[tokio::test]
    async fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, &RunOptions::default())
            .await
            .unwrap();

        let config_path = workspace.join(".callmodel").join("config.toml");
        std::fs::write(&config_path, "[store]\nbucket = \"edited\"\n").unwrap();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, &RunOptions::default())
            .await
            .unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[store]\nbucket = \"edited\"\n");
    }

    #[tokio::test]
    async fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        let command = Commands::Config {
            action: ConfigAction::Show,
        };
        let result = handle_command(command, dir.path(), &RunOptions::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invoke_offline() {
        let dir = TempDir::new().unwrap();
        let command = Commands::Invoke {
            model: "cohere.command-text-v14".into(),
            prompt: "Extract the band name".into(),
            json: true,
        };
        let options = RunOptions {
            gateway: None,
            offline: true,
        };
        let result = handle_command(command, dir.path(), &options).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_serve_rejects_gateway_flag() {
        let options = RunOptions {
            gateway: Some("http://127.0.0.1:8787".into()),
            offline: false,
        };
        let err = handle_serve(CallModelConfig::default(), &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--gateway"));
    }
}
