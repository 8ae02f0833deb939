use std::{collections::BTreeMap, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

use crate::{
    api::{
        error::{ApiError, invalid_config, signer_error},
        types::SignerConfig,
    },
    schedule::parse_duration,
};

/// The two tokens appended to a signed request as `nars` and `sesi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignTokens {
    pub nars: String,
    pub sesi: String,
}

/// Computes request signatures over a fully assembled parameter map.
///
/// Implementations must be deterministic for identical input and safe to
/// call from independent sessions concurrently.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, params: &BTreeMap<String, String>) -> Result<SignTokens, ApiError>;
}

pub fn build_signer(config: &SignerConfig) -> Result<Arc<dyn Signer>, ApiError> {
    match config {
        SignerConfig::Md5 { salt } => Ok(Arc::new(Md5Signer::new(salt.clone()))),
        SignerConfig::Command {
            program,
            args,
            timeout,
        } => {
            let timeout = parse_duration(timeout)
                .map_err(|err| invalid_config(format!("api.signer.timeout: {}", err)))?;
            Ok(Arc::new(CommandSigner::new(program.clone(), args.clone(), timeout)?))
        }
    }
}

/// Native digest signer over the key-sorted parameter set.
#[derive(Debug, Clone, Default)]
pub struct Md5Signer {
    salt: String,
}

impl Md5Signer {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    fn canonical(params: &BTreeMap<String, String>) -> String {
        params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[async_trait]
impl Signer for Md5Signer {
    async fn sign(&self, params: &BTreeMap<String, String>) -> Result<SignTokens, ApiError> {
        let canonical = Self::canonical(params);
        let nars = format!("{:x}", md5::compute(format!("{}{}", canonical, self.salt)));
        let sesi = format!("{:x}", md5::compute(format!("{}{}", self.salt, nars)));
        Ok(SignTokens { nars, sesi })
    }
}

/// Delegates signing to an external program.
///
/// The parameter map is written to the program's stdin as a JSON object;
/// the program must print `{"nars": "...", "sesi": "..."}` on stdout and
/// exit successfully within `timeout`.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSigner {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Result<Self, ApiError> {
        if program.trim().is_empty() {
            return Err(invalid_config("api.signer.program cannot be empty"));
        }

        Ok(Self {
            program,
            args,
            timeout,
        })
    }

    /// Spawn, stdin write and exit are all bounded by `timeout`; the child
    /// is killed when the deadline drops it.
    async fn run(&self, input: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        match timeout(self.timeout, self.exchange(input)).await {
            Ok(result) => result,
            Err(_) => Err(signer_error(format!(
                "signer '{}' did not finish within {:?}",
                self.program, self.timeout
            ))),
        }
    }

    async fn exchange(&self, input: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            signer_error(format!("failed to spawn signer '{}': {}", self.program, err))
        })?;

        // Stdin is fed while the output is drained so neither pipe can stall.
        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(&input).await,
                None => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output =
            output.map_err(|err| signer_error(format!("signer process failed: {}", err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(signer_error(format!(
                "signer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        fed.map_err(|err| signer_error(format!("failed to write signer input: {}", err)))?;

        Ok(output.stdout)
    }
}

#[async_trait]
impl Signer for CommandSigner {
    async fn sign(&self, params: &BTreeMap<String, String>) -> Result<SignTokens, ApiError> {
        let input = serde_json::to_vec(params)
            .map_err(|err| signer_error(format!("failed to encode signer input: {}", err)))?;
        let stdout = self.run(input).await?;

        serde_json::from_slice(&stdout)
            .map_err(|err| signer_error(format!("signer produced malformed output: {}", err)))
    }
}
