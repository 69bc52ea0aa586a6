use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use crate::{
    config,
    core::{
        error::{ProviderError, ProviderResult},
        traits::Launcher,
    },
};

/// Opens dispatch URIs by running a configured program.
///
/// The URI is appended to the configured arguments. The call returns once
/// the program has started; its exit status is only logged.
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(config: &config::Launcher) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, uri: &str) -> ProviderResult<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(uri)
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| ProviderError::Launch(format!("Unable to run {}: {e}", self.program)))?;

        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("{program} exited"),
                Ok(status) => warn!("{program} exited with {status}"),
                Err(e) => warn!("Failed to wait for {program}: {e}"),
            }
        });

        Ok(())
    }
}
