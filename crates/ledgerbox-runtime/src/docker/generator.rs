//! Compose-based network generator.
//!
//! Materializes a single-container microfab network: a compose document
//! plus the lifecycle scripts (`.sh` and `.cmd` twins, so a generated
//! environment keeps working when its directory moves across hosts).

use async_trait::async_trait;
use ledgerbox_core::{GeneratorError, LifecycleScript, NetworkGenerator, NetworkRequest};
use serde_json::json;
use std::path::Path;
use tracing::debug;

/// Template identifier this generator understands.
const TEMPLATE_MICROFAB: &str = "microfab";

/// Port the microfab container listens on internally.
const INTERNAL_PORT: u16 = 8080;

/// Generator materializing compose-based sandbox networks.
#[derive(Debug, Clone, Default)]
pub struct ComposeNetworkGenerator;

impl ComposeNetworkGenerator {
    /// Create a new generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetworkGenerator for ComposeNetworkGenerator {
    async fn run(
        &self,
        template_id: &str,
        request: &NetworkRequest,
    ) -> Result<(), GeneratorError> {
        if template_id != TEMPLATE_MICROFAB {
            return Err(GeneratorError::UnknownTemplate(template_id.to_string()));
        }

        debug!(
            environment = %request.name,
            destination = %request.destination.display(),
            port = request.port,
            orgs = request.num_organizations,
            "Materializing network"
        );

        tokio::fs::create_dir_all(&request.destination)
            .await
            .map_err(|e| GeneratorError::Io(e.to_string()))?;

        write_file(
            &request.destination.join("docker-compose.yml"),
            &compose_document(request),
        )
        .await?;

        for script in LifecycleScript::ALL {
            let sh = request.destination.join(format!("{}.sh", script.base_name()));
            write_file(&sh, &shell_script(script, &request.name)).await?;
            mark_executable(&sh).await?;

            let cmd = request.destination.join(format!("{}.cmd", script.base_name()));
            write_file(&cmd, &batch_script(script, &request.name)).await?;
        }

        Ok(())
    }
}

async fn write_file(path: &Path, content: &str) -> Result<(), GeneratorError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| GeneratorError::Io(e.to_string()))
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<(), GeneratorError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| GeneratorError::Io(e.to_string()))
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<(), GeneratorError> {
    Ok(())
}

/// Compose document for a single microfab container exposing the
/// environment's base port.
fn compose_document(request: &NetworkRequest) -> String {
    let organizations: Vec<_> = (1..=request.num_organizations)
        .map(|i| json!({ "name": format!("Org{i}") }))
        .collect();
    let config = json!({
        "port": INTERNAL_PORT,
        "endorsing_organizations": organizations,
        "channels": [{
            "name": "mychannel",
            "endorsing_organizations": (1..=request.num_organizations)
                .map(|i| format!("Org{i}"))
                .collect::<Vec<_>>(),
        }],
    });

    format!(
        "services:\n  \
           microfab:\n    \
             image: ghcr.io/hyperledger-labs/microfab:latest\n    \
             container_name: {name}_microfab\n    \
             environment:\n      \
               MICROFAB_CONFIG: '{config}'\n    \
             ports:\n      \
               - \"{port}:{internal}\"\n",
        name = request.name,
        config = config,
        port = request.port,
        internal = INTERNAL_PORT,
    )
}

fn compose(project: &str, action: &str) -> String {
    format!("docker compose --project-name {project} {action}")
}

fn shell_script(script: LifecycleScript, project: &str) -> String {
    let body = match script {
        LifecycleScript::Start => compose(project, "up --detach"),
        LifecycleScript::Stop => compose(project, "stop"),
        LifecycleScript::Teardown => compose(project, "down --volumes"),
        LifecycleScript::IsRunning => format!(
            "test -n \"$({})\"",
            compose(project, "ps --quiet --status running")
        ),
        LifecycleScript::KillChaincode => "docker kill \"$@\"".to_string(),
    };
    format!("#!/bin/sh\nset -e\ncd \"$(dirname \"$0\")\"\n{body}\n")
}

fn batch_script(script: LifecycleScript, project: &str) -> String {
    let body = match script {
        LifecycleScript::Start => compose(project, "up --detach"),
        LifecycleScript::Stop => compose(project, "stop"),
        LifecycleScript::Teardown => compose(project, "down --volumes"),
        LifecycleScript::IsRunning => format!(
            "{} | findstr . >nul",
            compose(project, "ps --quiet --status running")
        ),
        LifecycleScript::KillChaincode => "docker kill %*".to_string(),
    };
    format!("@echo off\r\ncd /d \"%~dp0\"\r\n{body}\r\n")
}
