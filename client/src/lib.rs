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

//! A synchronous client for the Hyperledger Fabric Gateway service.

#[macro_use]
extern crate log;

pub mod connection;
pub mod error;
pub mod gateway;
mod grpc;
pub mod identity;
pub mod profile;
pub mod proposal;
pub mod protos;
pub mod wallet;

pub use crate::connection::{ConnectionOptions, TlsOptions};
pub use crate::error::GatewayError;
pub use crate::gateway::{Contract, Gateway, GatewayBuilder, Network};
pub use crate::identity::{
    load_certificate, load_private_key_signer, PrivateKeySigner, Signer, X509Identity,
};
pub use crate::profile::ConnectionProfile;
pub use crate::wallet::{Wallet, WalletIdentity};
