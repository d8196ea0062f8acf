/*
    Copyright 2023 github.com/programaquatic

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use thiserror::Error;

/// The four error kinds from the error-handling design: configuration
/// errors and structural invariant violations abort the run, everything
/// else is recovered locally and only logged.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("numerical divergence at step {step}: {detail}")]
    Divergence { step: u64, detail: String },

    #[error("bounce failures ({failed}/{total}) exceeded threshold at step {step}")]
    BounceFailureExceeded {
        step: u64,
        failed: usize,
        total: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Process exit code for this error, per the external-interfaces contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Configuration(_) => 1,
            SimError::Divergence { .. } => 2,
            SimError::BounceFailureExceeded { .. } => 3,
            SimError::Io(_) | SimError::Json(_) => 1,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
