use clap::Parser;
use function_deploy::cli::Cli;
use function_deploy::error::{failure_message, Error};
use function_deploy::logger::Logger;
use function_deploy::runner::{Runnable, Runner};
use function_deploy::workflow::{GitHubWorkflow, Workflow};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    Logger::init();

    let workflow: Arc<dyn Workflow> = Arc::new(GitHubWorkflow::from_env());
    workflow.echo_commands(true);

    let mut runner = cli.runner(workflow.clone());

    if let Err(report) = runner.run().await {
        log::debug!("{report:?}");

        if let Some(details) = report.downcast_ref::<Error>().and_then(Error::details) {
            log::warn!("{details}");
        }

        workflow.set_failed(&failure_message(&report));
        std::process::exit(1);
    }
}
