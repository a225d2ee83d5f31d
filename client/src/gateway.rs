// Copyright 2018-2021 Cargill Incorporated
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

//! Blocking handles onto a Fabric Gateway peer.
//!
//! A [`Gateway`] owns the gRPC channel together with a single-threaded runtime that drives it, so
//! callers never need an async context. [`Network`] and [`Contract`] are lightweight views that
//! borrow the gateway; creating them performs no I/O.

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::{Builder as RuntimeBuilder, Runtime};

use crate::connection::ConnectionOptions;
use crate::error::GatewayError;
use crate::grpc::GatewayServiceClient;
use crate::identity::{Signer, X509Identity};
use crate::proposal::{PreparedProposal, ProposalBuilder};
use crate::protos::{EvaluateRequest, EvaluateResponse};
use crate::wallet::Wallet;

const DEFAULT_EVALUATE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GatewayBuilder {
    identity: X509Identity,
    signer: Box<dyn Signer>,
    evaluate_timeout: Duration,
}

impl GatewayBuilder {
    /// Uses the identity and signing key stored in `wallet` under `label`.
    pub fn from_wallet(wallet: &Wallet, label: &str) -> Result<Self, GatewayError> {
        let (identity, signer) = wallet
            .get(label)
            .ok_or_else(|| {
                GatewayError::InvalidArgument(format!("identity not found in wallet: {}", label))
            })?
            .to_parts()?;

        Ok(Gateway::builder(identity, signer))
    }

    pub fn with_evaluate_timeout(mut self, evaluate_timeout: Duration) -> Self {
        self.evaluate_timeout = evaluate_timeout;
        self
    }

    pub fn connect(self, options: &ConnectionOptions) -> Result<Gateway, GatewayError> {
        let runtime = RuntimeBuilder::new_current_thread()
            .enable_all()
            .build()
            .map_err(GatewayError::Runtime)?;

        let channel = runtime.block_on(options.connect())?;

        debug!(
            "Connected to gateway at {} as {}",
            options.address(),
            self.identity.msp_id()
        );

        Ok(Gateway {
            identity: self.identity,
            signer: self.signer,
            evaluate_timeout: self.evaluate_timeout,
            client: GatewayServiceClient::new(channel),
            runtime,
        })
    }
}

/// A connection to a Fabric Gateway peer acting on behalf of a single client identity.
///
/// The connection is released when the gateway is closed or dropped.
pub struct Gateway {
    identity: X509Identity,
    signer: Box<dyn Signer>,
    evaluate_timeout: Duration,
    client: GatewayServiceClient,
    // Declared last so the channel is dropped before the runtime driving it.
    runtime: Runtime,
}

impl Gateway {
    pub fn builder<S: Signer + 'static>(identity: X509Identity, signer: S) -> GatewayBuilder {
        GatewayBuilder {
            identity,
            signer: Box::new(signer),
            evaluate_timeout: DEFAULT_EVALUATE_TIMEOUT,
        }
    }

    pub fn network(&self, channel_name: &str) -> Network<'_> {
        Network {
            gateway: self,
            name: channel_name.to_string(),
        }
    }

    pub fn close(self) {
        drop(self)
    }

    fn evaluate(&self, proposal: PreparedProposal) -> Result<Vec<u8>, GatewayError> {
        let mut client = self.client.clone();
        let timeout = self.evaluate_timeout;
        let transaction_id = proposal.transaction_id.clone();

        // No grpc-timeout header; the local timeout alone must expire to get DeadlineExceeded.
        let request = tonic::Request::new(EvaluateRequest {
            transaction_id: proposal.transaction_id,
            channel_id: proposal.channel_id,
            proposed_transaction: Some(proposal.signed_proposal),
            target_organizations: Vec::new(),
        });

        debug!("Evaluating transaction {}", transaction_id);

        let response = self.runtime.block_on(async move {
            match tokio::time::timeout(timeout, client.evaluate(request)).await {
                Ok(response) => response,
                Err(_) => Err(tonic::Status::deadline_exceeded(format!(
                    "evaluate did not complete within {:?}",
                    timeout
                ))),
            }
        })?;

        Ok(result_payload(response.into_inner()))
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        debug!("Closing gateway connection");
    }
}

/// A channel on the network reachable through a gateway.
pub struct Network<'a> {
    gateway: &'a Gateway,
    name: String,
}

impl<'a> Network<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contract(&self, chaincode_name: &str) -> Contract<'a> {
        Contract {
            gateway: self.gateway,
            channel_name: self.name.clone(),
            chaincode_name: chaincode_name.to_string(),
            contract_name: None,
        }
    }

    /// A named contract within a chaincode; transaction names are qualified as
    /// `<contract>:<transaction>`.
    pub fn contract_with_name(&self, chaincode_name: &str, contract_name: &str) -> Contract<'a> {
        Contract {
            contract_name: Some(contract_name.to_string()),
            ..self.contract(chaincode_name)
        }
    }
}

/// A smart contract deployed in a chaincode on a channel.
pub struct Contract<'a> {
    gateway: &'a Gateway,
    channel_name: String,
    chaincode_name: String,
    contract_name: Option<String>,
}

impl<'a> Contract<'a> {
    /// Evaluates a transaction and returns its result. Nothing is written to the ledger.
    pub fn evaluate_transaction(
        &self,
        transaction_name: &str,
        arguments: &[&[u8]],
    ) -> Result<Vec<u8>, GatewayError> {
        self.evaluate(
            transaction_name,
            arguments.iter().map(|arg| arg.to_vec()).collect(),
            HashMap::new(),
        )
    }

    /// Evaluates a transaction with private data passed in the proposal's transient map.
    pub fn evaluate(
        &self,
        transaction_name: &str,
        arguments: Vec<Vec<u8>>,
        transient_data: HashMap<String, Vec<u8>>,
    ) -> Result<Vec<u8>, GatewayError> {
        let qualified_name =
            qualified_transaction_name(self.contract_name.as_deref(), transaction_name);

        let proposal = ProposalBuilder::new(
            &self.gateway.identity,
            self.gateway.signer.as_ref(),
            &self.channel_name,
            &self.chaincode_name,
        )
        .with_transaction_name(&qualified_name)
        .with_arguments(arguments)
        .with_transient_data(transient_data)
        .build()?;

        self.gateway.evaluate(proposal)
    }
}

fn qualified_transaction_name(contract_name: Option<&str>, transaction_name: &str) -> String {
    match contract_name {
        Some(contract_name) if !contract_name.is_empty() => {
            format!("{}:{}", contract_name, transaction_name)
        }
        _ => transaction_name.to_string(),
    }
}

/// The peer's response payload. A response without a result carries an empty payload.
fn result_payload(response: EvaluateResponse) -> Vec<u8> {
    response
        .result
        .map(|result| result.payload)
        .unwrap_or_default()
}
