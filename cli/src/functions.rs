use crate::api::client::Session;
use crate::api::function::Function;
use crate::api::operation::Operation;
use crate::api::version::CreateFunctionVersionRequest;
use crate::config::Endpoints;
use crate::error::Error;
use crate::workflow::Workflow;
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Operations of the deployment service the deploy step relies on
#[async_trait]
pub trait FunctionService: Send + Sync {
    /// None when there is no function with such id
    async fn get(&self, function_id: &str) -> eyre::Result<Option<Function>>;

    async fn create_version(&self, request: &CreateFunctionVersionRequest) -> eyre::Result<Operation>;
}

/// Serverless functions REST API
///
/// The session is opened on first use, nothing goes over the network before that.
pub struct ApiFunctionService {
    token: String,
    endpoints: Endpoints,
    session: OnceCell<Session>,
}

impl ApiFunctionService {
    pub fn new(token: &str, endpoints: Endpoints) -> Self {
        ApiFunctionService {
            token: token.to_string(),
            endpoints,
            session: OnceCell::new(),
        }
    }

    async fn session(&self) -> eyre::Result<&Session> {
        self.session
            .get_or_try_init(|| Session::new(&self.token, self.endpoints.clone()))
            .await
    }
}

#[async_trait]
impl FunctionService for ApiFunctionService {
    async fn get(&self, function_id: &str) -> eyre::Result<Option<Function>> {
        let session = self.session().await?;
        let path = format!("/functions/v1/functions/{function_id}");
        session.send(&path, session.get(&path)).await
    }

    async fn create_version(&self, request: &CreateFunctionVersionRequest) -> eyre::Result<Operation> {
        let session = self.session().await?;
        let path = "/functions/v1/versions";

        let operation = session
            .send::<Operation>(path, session.post(path).json(request))
            .await?;

        created_operation(operation)
    }
}

/// A 404 from version creation means the function disappeared after the lookup
fn created_operation(operation: Option<Operation>) -> eyre::Result<Operation> {
    operation.ok_or_else(|| {
        Error::new(
            "Failed to create function version",
            Some("The function was not found, it may have been removed after the lookup."),
        )
        .into()
    })
}

/// Resolve the function a version is created for
pub async fn get_function_by_id(
    workflow: &dyn Workflow,
    service: &dyn FunctionService,
    function_id: &str,
) -> eyre::Result<Function> {
    let _group = workflow.group(&format!("Get function by ID: \"{function_id}\""));

    let Some(function) = service.get(function_id).await? else {
        return Err(Error::new(
            "Failed to find Function by id",
            Some("Check the \"function_id\" input and the token's access to the folder."),
        )
        .into());
    };

    log::info!("Function found: \"{} ({})\"", function.id, function.name);
    Ok(function)
}

/// In-memory deployment service
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryFunctions {
    pub(crate) functions: Vec<Function>,
    pub(crate) operation: Operation,
    pub(crate) requests: std::sync::Mutex<Vec<CreateFunctionVersionRequest>>,
}

#[cfg(test)]
#[async_trait]
impl FunctionService for MemoryFunctions {
    async fn get(&self, function_id: &str) -> eyre::Result<Option<Function>> {
        Ok(self.functions.iter().find(|f| f.id == function_id).cloned())
    }

    async fn create_version(&self, request: &CreateFunctionVersionRequest) -> eyre::Result<Operation> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.operation.clone())
    }
}
