//! TokenLock command-line front end.
//!
//! Stands in for the app UI: each subcommand is one user action. The biometric
//! sensor is simulated on the terminal.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;

use tokenlock_app_lib::commands;
use tokenlock_app_lib::keyguard::{
    AuthConfirmation, BiometricAvailability, BiometricPrompt, CeremonyResult, CryptoObject,
    GateOutcome, PromptInfo,
};
use tokenlock_app_lib::AppState;

/// TokenLock - biometric-gated session token
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding settings, the key store and the ciphertext record
    #[arg(long, default_value = ".tokenlock")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show biometric availability and whether biometric login is enabled
    Status,
    /// Log in with username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Encrypt a token under biometric approval
    Enable {
        #[arg(long)]
        token: String,
    },
    /// Decrypt the stored token under biometric approval
    Biometric,
    /// Remove the stored record and key
    Disable,
    /// Simulate enrolling a new biometric (software key store only)
    #[cfg(not(feature = "os-keyring"))]
    Reenroll,
}

/// Simulated sensor: asks on the terminal whether the finger matched.
struct ConsolePrompt;

#[async_trait]
impl BiometricPrompt for ConsolePrompt {
    fn availability(&self) -> BiometricAvailability {
        BiometricAvailability::Available
    }

    async fn authenticate(&self, info: &PromptInfo, crypto: &CryptoObject) -> CeremonyResult {
        let question = format!(
            "{}\n{}\nTouch the sensor to {}: [y] match, [n] no match, [c] {} > ",
            info.title, info.subtitle, crypto.mode, info.negative_button_text
        );

        let answer = tokio::task::spawn_blocking(move || {
            print!("{}", question);
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => match line.trim() {
                "y" | "Y" => CeremonyResult::Succeeded(AuthConfirmation {
                    session_id: crypto.session_id,
                }),
                "n" | "N" => CeremonyResult::Failed("Biometric not recognized".into()),
                _ => CeremonyResult::Cancelled,
            },
            Ok(Err(e)) => CeremonyResult::Failed(format!("Failed to read sensor: {}", e)),
            Err(e) => CeremonyResult::Failed(format!("Sensor task failed: {}", e)),
        }
    }
}

fn print_outcome<T: std::fmt::Display>(outcome: GateOutcome<T>) {
    match outcome {
        GateOutcome::Succeeded(value) => println!("Succeeded: {}", value),
        GateOutcome::Failed(reason) => println!("Failed: {}", reason),
        GateOutcome::Cancelled => println!("Cancelled"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tokenlock_app_lib::init_tracing();

    let args = Args::parse();
    let state = AppState::open(&args.data_dir, Arc::new(ConsolePrompt))
        .with_context(|| format!("Failed to open data directory {:?}", args.data_dir))?;

    info!("TokenLock started");

    match args.command {
        Command::Status => {
            let status = commands::biometric_status(&state).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Login { username, password } => {
            let token = commands::login_with_password(&state, &username, &password).await?;
            println!("Logged in as {} with token {}", username, token.as_str());
        }
        Command::Enable { token } => {
            let outcome = commands::enable_biometric_login(&state, &token).await?;
            print_outcome(outcome.map(|()| "biometric login enabled"));
        }
        Command::Biometric => {
            let outcome = commands::attempt_biometric_login(&state).await?;
            print_outcome(outcome.map(|token| format!("token {}", token.as_str())));
        }
        Command::Disable => {
            commands::disable_biometric_login(&state).await?;
            println!("Biometric login disabled");
        }
        #[cfg(not(feature = "os-keyring"))]
        Command::Reenroll => {
            let path = tokenlock_app_lib::storage::get_keystore_path(&state.data_dir);
            drop(state);
            tokenlock_app_lib::keyguard::SoftwareKeyStore::open(path)?
                .simulate_enrollment_change()?;
            println!("Biometric enrollment changed; existing keys are invalidated");
        }
    }

    Ok(())
}
