// Copyright 2019 Cargill Incorporated
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error;
use std::fmt;
use std::io;

use fabric_gateway_client::GatewayError;
use flexi_logger::FlexiLoggerError;

#[derive(Debug)]
pub enum CliError {
    LoggingInitializationError(Box<FlexiLoggerError>),
    /// Missing or invalid command line arguments; carries the parser's message and usage.
    UsageError(String),
    /// Credentials or connection settings could not be loaded.
    SetupError(GatewayError),
    ConnectionError(GatewayError),
    EvaluateError(GatewayError),
    FormatError(serde_json::Error),
    IoError(io::Error),
}

impl CliError {
    /// The process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UsageError(_) => 2,
            _ => 1,
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::LoggingInitializationError(err) => Some(err),
            CliError::UsageError(_) => None,
            CliError::SetupError(err) => Some(err),
            CliError::ConnectionError(err) => Some(err),
            CliError::EvaluateError(err) => Some(err),
            CliError::FormatError(err) => Some(err),
            CliError::IoError(err) => Some(err),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::LoggingInitializationError(err) => {
                write!(f, "LoggingInitializationError: {}", err)
            }
            CliError::UsageError(msg) => f.write_str(msg),
            CliError::SetupError(err) => write!(f, "Error: {}", err),
            CliError::ConnectionError(err) => {
                write!(f, "Error: failed to connect to Fabric Gateway: {}", err)
            }
            CliError::EvaluateError(err) => {
                write!(f, "Error: failed to evaluate transaction: {}", err)
            }
            CliError::FormatError(err) => write!(f, "Error: failed to parse JSON: {}", err),
            CliError::IoError(err) => write!(f, "IoError: {}", err),
        }
    }
}

impl From<FlexiLoggerError> for CliError {
    fn from(err: FlexiLoggerError) -> Self {
        CliError::LoggingInitializationError(Box::new(err))
    }
}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        CliError::SetupError(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::FormatError(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::IoError(err)
    }
}
