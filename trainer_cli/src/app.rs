use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use trainer_config::{TrainerConfig, UploadMode};
use trainer_logging::{LoggingConfig, init_logging};
use trainer_types::Machine;
use training_session::{SourceFile, TrainingController};
use utils::ByteSize;

use crate::CURRENT_VERSION;
use crate::console::ConsoleObserver;

#[derive(Subcommand, Debug)]
enum MachinesCommand {
    /// List registered machines with their latest model.
    List,

    /// Register a new machine.
    Add {
        name: String,

        #[clap(long)]
        image_url: Option<String>,
    },

    /// Delete a machine, by id or name.
    Delete { machine: String },
}

#[derive(Subcommand, Debug)]
enum GatewayCommand {
    /// Start the inference gateway for a machine name.
    Start { name: String },
    /// Stop the inference gateway for a machine name.
    Stop { name: String },
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Machine id or name.
    machine: String,

    /// CSV file with sensor readings.
    file: PathBuf,

    /// Send the file in one request instead of chunks.
    #[clap(long)]
    whole_file: bool,

    /// Chunk size for chunked uploads, e.g. "512KiB" or "1MiB".
    #[clap(long)]
    chunk_size: Option<ByteSize>,

    /// Return once the upload is done instead of waiting for training to finish.
    #[clap(long)]
    no_wait: bool,
}

#[derive(Args, Debug)]
struct InferArgs {
    /// Machine id or name.
    machine: String,

    /// Inference payload, e.g. a CSV row.
    #[clap(long, conflicts_with = "payload_file")]
    payload: Option<String>,

    /// Read the inference payload from a file.
    #[clap(long)]
    payload_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[non_exhaustive]
enum Command {
    /// Manage registered machines.
    #[clap(subcommand)]
    Machines(MachinesCommand),

    /// Show the machines dashboard.
    Dashboard,

    /// Upload a training file for a machine and follow the training job.
    Train(TrainArgs),

    /// Follow an existing training job until it finishes.
    Status {
        /// Machine id or name.
        machine: String,
        tracking_id: String,
    },

    /// Run inference with a machine's latest model.
    Infer(InferArgs),

    /// Control the inference gateway.
    #[clap(subcommand)]
    Inference(GatewayCommand),
}

#[derive(Args, Debug)]
struct CliOverrides {
    /// Base URL of the API gateway.  Overrides TRAINER_CLIENT_ENDPOINT.
    #[clap(long)]
    endpoint: Option<String>,

    /// Bearer token.  Overrides TRAINER_CLIENT_AUTH_TOKEN.
    #[clap(long)]
    token: Option<String>,

    /// Write logs to this directory instead of stderr.
    #[clap(long)]
    log: Option<PathBuf>,
}

/// Client for the machine model trainer: register machines, upload sensor data, follow
/// training jobs and run inference.
///
/// Every setting can also be given through TRAINER_* environment variables.
#[derive(Parser, Debug)]
#[clap(name = "trainer", version = CURRENT_VERSION, propagate_version = true)]
pub struct TrainerApp {
    #[clap(flatten)]
    overrides: CliOverrides,

    #[clap(subcommand)]
    command: Command,
}

impl TrainerApp {
    fn config(&self) -> TrainerConfig {
        let mut config = TrainerConfig::new();
        if let Some(endpoint) = &self.overrides.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(token) = &self.overrides.token {
            config.client.auth_token = Some(token.clone());
        }
        if let Command::Train(args) = &self.command {
            if args.whole_file {
                config.upload.mode = UploadMode::WholeFile;
            }
            if let Some(chunk_size) = args.chunk_size {
                config.upload.chunk_size = chunk_size;
            }
        }
        config
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();
        let logging = match &self.overrides.log {
            Some(dir) => LoggingConfig::to_directory(CURRENT_VERSION, dir),
            None => LoggingConfig::from_config(CURRENT_VERSION, &config.log),
        };
        if let Some(file) = init_logging(logging) {
            eprintln!("logging to {}", file.display());
        }

        let observer = Arc::new(ConsoleObserver::new());
        let controller = TrainingController::from_trainer_config(&config, observer.clone())
            .context("failed to set up trainer client")?;
        info!(endpoint = %config.client.endpoint, mode = %controller.upload_mode(), "trainer started");

        let result = tokio::select! {
            result = self.command.run(&controller, &observer) => result,
            _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
        };
        controller.shutdown();
        result
    }
}

impl Command {
    async fn run(&self, controller: &TrainingController, observer: &ConsoleObserver) -> Result<()> {
        match self {
            Command::Machines(MachinesCommand::List) => {
                let machines = controller.load_machines().await?;
                if machines.is_empty() {
                    println!("No machines yet. Add one with `trainer machines add <name>`.");
                }
                for m in &machines {
                    println!("{}", describe_machine(m));
                }
            },
            Command::Machines(MachinesCommand::Add { name, image_url }) => {
                let machine = controller.add_machine(name, image_url.as_deref()).await?;
                println!("added {}", describe_machine(&machine));
            },
            Command::Machines(MachinesCommand::Delete { machine }) => {
                let machine = resolve(controller, observer, machine).await?;
                controller.delete_machine(&machine.id).await?;
                println!("deleted {} ({})", machine.name, machine.id);
            },
            Command::Dashboard => {
                for s in controller.dashboard().await? {
                    let progress = s.training_progress.map(|p| format!(" training {p:.0}%")).unwrap_or_default();
                    let results = s
                        .last_inference_results
                        .map(|r| format!(" last inference {r:?}"))
                        .unwrap_or_default();
                    println!("{:<24} {}{progress}{results}", s.name, s.status);
                }
            },
            Command::Train(args) => {
                let machine = resolve(controller, observer, &args.machine).await?;
                let file = SourceFile::from_path(&args.file)
                    .await
                    .with_context(|| format!("cannot read {}", args.file.display()))?;
                controller.select_file(&machine.id, Some(file))?;

                let outcome = controller.start_upload(&machine.id).await?;
                println!("tracking id: {}", outcome.tracking_id);
                if args.no_wait {
                    controller.cancel_polling(&machine.id);
                    return Ok(());
                }
                print_training_result(controller, &machine).await?;
            },
            Command::Status { machine, tracking_id } => {
                let machine = resolve(controller, observer, machine).await?;
                controller.start_polling(&machine.id, tracking_id)?;
                print_training_result(controller, &machine).await?;
            },
            Command::Infer(args) => {
                let machine = resolve(controller, observer, &args.machine).await?;
                let payload = match (&args.payload, &args.payload_file) {
                    (Some(p), _) => p.clone(),
                    (None, Some(path)) => tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("cannot read {}", path.display()))?,
                    (None, None) => String::new(),
                };
                controller.set_inference_input(&machine.id, &payload)?;
                let value = controller.run_inference(&machine.id).await?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            },
            Command::Inference(GatewayCommand::Start { name }) => {
                controller.toggle_inference(name, true).await?;
                println!("inference started for {name}");
            },
            Command::Inference(GatewayCommand::Stop { name }) => {
                controller.toggle_inference(name, false).await?;
                println!("inference stopped for {name}");
            },
        }
        Ok(())
    }
}

async fn resolve(controller: &TrainingController, observer: &ConsoleObserver, key: &str) -> Result<Machine> {
    controller.load_machines().await?;
    let machine = controller
        .find_machine(key)
        .ok_or_else(|| anyhow!("no machine with id or name {key:?}"))?;
    observer.set_name(&machine.id, &machine.name);
    Ok(machine)
}

async fn print_training_result(controller: &TrainingController, machine: &Machine) -> Result<()> {
    let state = controller.wait_for_polling(&machine.id).await?;
    if let Some(result) = &state.result {
        println!("training result: {}", serde_json::to_string_pretty(result)?);
    }
    if let Some(model_id) = &state.model_id {
        println!("model id: {model_id}");
    }
    Ok(())
}

fn describe_machine(m: &Machine) -> String {
    match (&m.latest_model_id, &m.latest_model_status) {
        (Some(model), status) => format!(
            "{:<8} {:<24} model {model} ({})",
            m.id,
            m.name,
            status.as_deref().unwrap_or("completed")
        ),
        (None, _) => format!("{:<8} {:<24} no model", m.id, m.name),
    }
}
