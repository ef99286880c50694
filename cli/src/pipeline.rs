use crate::api::operation::Operation;
use crate::archive::zip_directory;
use crate::functions::{get_function_by_id, FunctionService};
use crate::inputs::Inputs;
use crate::storage::{stage_package, ObjectStore};
use crate::version::{create_function_version, Settings};
use crate::workflow::Workflow;
use eyre::OptionExt;
use std::sync::Arc;

/// Name of the step output holding the completion time
pub const TIME_OUTPUT: &str = "time";

/// The deploy sequence: archive, stage, locate the function, create a version
///
/// Every stage runs to completion before the next one starts, the first failure ends the run.
pub struct Pipeline {
    workflow: Arc<dyn Workflow>,
    store: Arc<dyn ObjectStore>,
    functions: Arc<dyn FunctionService>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub async fn run(&self, inputs: &Inputs) -> eyre::Result<Operation> {
        let workflow = self.workflow.as_ref();
        let settings = Settings::parse(inputs)?;

        let archive = zip_directory(workflow, &inputs.source, &inputs.source_ignore).await?;
        log::info!("Buffer size: {}b", archive.len());

        let source = stage_package(workflow, self.store.as_ref(), inputs, archive).await?;
        let function = get_function_by_id(workflow, self.functions.as_ref(), &inputs.function_id).await?;

        let operation = create_function_version(
            workflow,
            self.functions.as_ref(),
            &function,
            inputs,
            &settings,
            source,
        )
        .await?;

        workflow.set_output(TIME_OUTPUT, &completed_at())?;
        Ok(operation)
    }
}

/// Wall clock time, e.g. "14:05:09 GMT+0300"
fn completed_at() -> String {
    chrono::Local::now().format("%H:%M:%S GMT%z").to_string()
}

#[derive(Default)]
pub struct PipelineBuilder {
    workflow: Option<Arc<dyn Workflow>>,
    store: Option<Arc<dyn ObjectStore>>,
    functions: Option<Arc<dyn FunctionService>>,
}

impl PipelineBuilder {
    pub fn set_workflow(mut self, workflow: Arc<dyn Workflow>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    pub fn set_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn set_function_service(mut self, functions: Arc<dyn FunctionService>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn build(self) -> eyre::Result<Pipeline> {
        Ok(Pipeline {
            workflow: self.workflow.ok_or_eyre("No workflow provided")?,
            store: self.store.ok_or_eyre("No object store provided")?,
            functions: self.functions.ok_or_eyre("No function service provided")?,
        })
    }
}
