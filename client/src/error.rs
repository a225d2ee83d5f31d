// Copyright 2018 Cargill Incorporated
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
use std::io::Error as IoError;
use std::path::PathBuf;

use openssl::error::ErrorStack;
use prost::{DecodeError, EncodeError};

use crate::protos::ErrorDetail;

#[derive(Debug)]
pub enum GatewayError {
    /// A file could not be read.
    Io { path: PathBuf, source: IoError },
    /// A certificate or private key could not be parsed or used.
    Identity(String),
    /// The connection profile could not be parsed or resolved.
    Profile(String),
    /// An argument passed to the client was invalid.
    InvalidArgument(String),
    /// The gRPC channel could not be configured or established.
    Transport(tonic::transport::Error),
    /// The gateway rejected the request.
    Status {
        code: tonic::Code,
        message: String,
        details: Vec<ErrorDetail>,
    },
    Crypto(ErrorStack),
    Encode(EncodeError),
    Decode(DecodeError),
    Runtime(IoError),
}

impl GatewayError {
    pub fn io<P: Into<PathBuf>>(path: P, source: IoError) -> Self {
        GatewayError::Io {
            path: path.into(),
            source,
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::Io { source, .. } => Some(source),
            GatewayError::Transport(err) => Some(err),
            GatewayError::Crypto(err) => Some(err),
            GatewayError::Encode(err) => Some(err),
            GatewayError::Decode(err) => Some(err),
            GatewayError::Runtime(err) => Some(err),
            GatewayError::Identity(_)
            | GatewayError::Profile(_)
            | GatewayError::InvalidArgument(_)
            | GatewayError::Status { .. } => None,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GatewayError::Io { path, source } => {
                write!(f, "unable to read {}: {}", path.display(), source)
            }
            GatewayError::Identity(msg) => f.write_str(msg),
            GatewayError::Profile(msg) => write!(f, "invalid connection profile: {}", msg),
            GatewayError::InvalidArgument(msg) => f.write_str(msg),
            GatewayError::Transport(err) => match err.source() {
                Some(cause) => write!(f, "{}: {}", err, cause),
                None => write!(f, "{}", err),
            },
            GatewayError::Status {
                message, details, ..
            } => {
                f.write_str(message)?;
                for detail in details {
                    write!(
                        f,
                        "\n    address: {}; mspId: {}; message: {}",
                        detail.address, detail.msp_id, detail.message
                    )?;
                }
                Ok(())
            }
            GatewayError::Crypto(err) => write!(f, "cryptographic operation failed: {}", err),
            GatewayError::Encode(err) => write!(f, "unable to encode message: {}", err),
            GatewayError::Decode(err) => write!(f, "unable to decode message: {}", err),
            GatewayError::Runtime(err) => write!(f, "unable to start runtime: {}", err),
        }
    }
}

impl From<tonic::transport::Error> for GatewayError {
    fn from(err: tonic::transport::Error) -> Self {
        GatewayError::Transport(err)
    }
}

impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self {
        let details = crate::protos::decode_error_details(status.details());
        GatewayError::Status {
            code: status.code(),
            message: status.message().to_string(),
            details,
        }
    }
}

impl From<ErrorStack> for GatewayError {
    fn from(err: ErrorStack) -> Self {
        GatewayError::Crypto(err)
    }
}

impl From<EncodeError> for GatewayError {
    fn from(err: EncodeError) -> Self {
        GatewayError::Encode(err)
    }
}

impl From<DecodeError> for GatewayError {
    fn from(err: DecodeError) -> Self {
        GatewayError::Decode(err)
    }
}
