//! Host errors

use crate::InstanceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Unknown instance {0}")]
    UnknownInstance(InstanceId),

    #[error("Instance {0} is not mounted")]
    NotMounted(InstanceId),

    #[error("No root rendered into container {0:?}")]
    NoRoot(String),

    #[error("No {0} entry point installed")]
    MissingEntryPoint(&'static str),
}
