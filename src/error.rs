// Copyright 2018 Chris Pearce
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MineError {
    #[error("not enough memory")]
    OutOfMemory,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("transactions are not table-derived")]
    NotTabular,

    #[error("processing aborted by user")]
    Cancelled,

    #[error("mining failed: {0}")]
    MiningFailure(String),

    #[error("no (frequent) items found")]
    NoItems,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MineError::InvalidConfiguration(message.into())
    }
}

impl From<TryReserveError> for MineError {
    fn from(_: TryReserveError) -> Self {
        MineError::OutOfMemory
    }
}

pub type MineResult<T> = Result<T, MineError>;
