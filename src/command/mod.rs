//! Command dispatch
//!
//! Maps command text to an executor by its leading keywords. Names may span
//! several words (`CREATE CLASS`); the longest registered name that prefixes
//! the text wins.

mod registry;
mod select;

pub use registry::CommandRegistry;
pub use select::SelectCommand;

use crate::errors::QueryResult;
use crate::executor::{ExecutionStats, ResultListener};
use crate::visitor::Parameters;

/// A command ready to run
pub trait CommandExecutor: Send {
    fn execute(&mut self, params: &Parameters, listener: &mut dyn ResultListener) -> QueryResult<ExecutionStats>;
}

/// Builds an executor for one command text
pub trait CommandFactory: Send + Sync {
    fn create(&self, text: &str) -> QueryResult<Box<dyn CommandExecutor>>;
}

impl<F> CommandFactory for F
where
    F: Fn(&str) -> QueryResult<Box<dyn CommandExecutor>> + Send + Sync,
{
    fn create(&self, text: &str) -> QueryResult<Box<dyn CommandExecutor>> {
        self(text)
    }
}
