use crate::cli::Cli;
use crate::config::Endpoints;
use crate::error::Error;
use crate::functions::ApiFunctionService;
use crate::inputs::Inputs;
use crate::pipeline::Pipeline;
use crate::storage::S3Store;
use crate::workflow::Workflow;
use std::error::Error as StdError;
use std::sync::Arc;

// Only awaited from main
#[allow(async_fn_in_trait)]
pub trait Runner {
    /// Run the command
    ///
    /// Returns an error the run is marked failed with
    async fn run(&mut self) -> eyre::Result<()>;

    /// Error to fail the run with, a generic one if no title is given
    ///
    /// The origin goes to the log only.
    fn error(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<Box<dyn StdError + Send + Sync>>,
    ) -> Error {
        if let Some(origin) = origin {
            log::error!("{origin:?}");
        }

        match title {
            Some(title) => Error::new(title, description),
            None => Error::new(
                "Failed to run the command",
                Some("This is a bug in function-deploy, please report it."),
            ),
        }
    }
}

/// Return a runner for a command
pub trait Runnable {
    fn runner(&self, workflow: Arc<dyn Workflow>) -> impl Runner;
}

/// Deploy a new function version from the step inputs
pub struct DeployRunner<'a> {
    cli: &'a Cli,
    workflow: Arc<dyn Workflow>,
}

impl Runnable for Cli {
    fn runner(&self, workflow: Arc<dyn Workflow>) -> impl Runner {
        DeployRunner {
            cli: self,
            workflow,
        }
    }
}

impl Runner for DeployRunner<'_> {
    async fn run(&mut self) -> eyre::Result<()> {
        let inputs = Inputs::collect(self.cli)?;

        for secret in inputs.secrets() {
            self.workflow.add_mask(secret);
        }

        let endpoints = Endpoints::from_env();

        let operation = Pipeline::builder()
            .set_workflow(self.workflow.clone())
            .set_object_store(Arc::new(S3Store::new(endpoints.clone())))
            .set_function_service(Arc::new(ApiFunctionService::new(&inputs.token, endpoints)))
            .build()
            .map_err(|e| self.error(None, None, Some(e.into())))?
            .run(&inputs)
            .await?;

        log::info!("Version requested, operation \"{}\"", operation.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::failure_message;

    struct Failing;

    impl Runner for Failing {
        async fn run(&mut self) -> eyre::Result<()> {
            Err(self
                .error(
                    Some("Failed to deploy"),
                    Some("Check the inputs."),
                    Some("connection reset".into()),
                )
                .into())
        }
    }

    #[tokio::test]
    async fn titled_error_keeps_title_and_hint() {
        let report = Failing.run().await.unwrap_err();
        let error = report.downcast_ref::<Error>().unwrap();

        assert_eq!(error.message(), "Failed to deploy");
        assert_eq!(error.details(), Some("Check the inputs."));
        assert_eq!(failure_message(&report), "Failed to deploy");
    }

    #[test]
    fn untitled_error_is_generic() {
        let origin = eyre::eyre!("No workflow provided");
        let error = Failing.error(None, Some("ignored"), Some(origin.into()));

        assert_eq!(error.message(), "Failed to run the command");
        assert!(error.details().unwrap().contains("report"));
    }
}
