use super::Stage;

/// Program build failures. Each carries the diagnostic text verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: Stage, log: String },

    #[error("program failed to link:\n{log}")]
    Link { log: String },
}

impl ShaderError {
    /// Diagnostic text produced by the compiler or linker.
    pub fn log(&self) -> &str {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => log,
        }
    }
}
