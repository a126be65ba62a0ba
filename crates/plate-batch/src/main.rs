mod cli;
mod pipeline;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use plate_batch_client::AlprClient;
use plate_batch_redact::Redactor;
use plate_batch_source::{ImageSource, SftpAuth, SftpConfig};
use tokio::task;

use cli::{CliArgs, Command};
use pipeline::{PipelineConfig, RunError, run_pipeline};
use settings::resolve_settings;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<(), RunError> {
    let settings = resolve_settings(&args.shared)?;

    let client = AlprClient::new(settings.endpoint.clone(), settings.client_options.clone())?;
    let redactor = match settings.redaction.clone() {
        Some(redaction) => Some(Redactor::new(redaction)?),
        None => None,
    };

    let source = build_source(&args.command)?;
    let config = PipelineConfig::from_settings(&settings);
    let report = run_pipeline(&source, &client, redactor.as_ref(), &config).await?;

    println!("{}", report.to_json_pretty().map_err(RunError::Emit)?);
    Ok(())
}

fn build_source(command: &Command) -> Result<ImageSource, RunError> {
    match command {
        Command::Files(args) => Ok(ImageSource::local(&args.patterns)?),
        Command::Sftp(args) => {
            let auth = SftpAuth::from_options(args.password.clone(), args.pkey.clone())?;
            let config = SftpConfig {
                host: args.host.clone(),
                port: args.port,
                user: args.user.clone(),
                folder: args.folder.clone(),
                auth,
            };
            Ok(task::block_in_place(|| ImageSource::sftp(&config))?)
        }
    }
}
