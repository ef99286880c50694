/// Display global error message in unified format
#[derive(Clone, Debug)]
pub struct Error(String, Option<String>);

impl Error {
    pub fn new(message: &str, details: Option<&str>) -> Self {
        Error(message.to_string(), details.map(|d| d.to_string()))
    }

    /// The headline without the hint
    pub fn message(&self) -> &str {
        &self.0
    }

    pub fn details(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Display the message and details, as sort of a hint
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.1 {
            Some(details) => write!(f, "{}\n\n{}", self.0, console::style(details).dim()),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Implement std::error::Error trait for Error
impl std::error::Error for Error {}

/// The message a failed run is reported with
///
/// Our own errors are reduced to their headline, anything else is shown as the outermost context.
pub fn failure_message(report: &eyre::Report) -> String {
    match report.downcast_ref::<Error>() {
        Some(error) => error.message().to_string(),
        None => report.to_string(),
    }
}
