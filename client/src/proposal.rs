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

//! Construction of signed transaction proposals.

use std::collections::HashMap;
use std::time::SystemTime;

use openssl::hash::{hash, MessageDigest};
use openssl::rand::rand_bytes;
use prost::Message;

use crate::error::GatewayError;
use crate::identity::{Signer, X509Identity};
use crate::protos::{
    ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec,
    ChaincodeProposalPayload, ChaincodeSpec, ChaincodeType, ChannelHeader, Header, Proposal,
    SignatureHeader, SignedProposal, HEADER_TYPE_ENDORSER_TRANSACTION,
};

const NONCE_LENGTH: usize = 24;

/// A proposal ready to be sent to the gateway, along with its transaction ID.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedProposal {
    pub transaction_id: String,
    pub channel_id: String,
    pub signed_proposal: SignedProposal,
}

pub struct ProposalBuilder<'a> {
    identity: &'a X509Identity,
    signer: &'a dyn Signer,
    channel_id: String,
    chaincode_name: String,
    transaction_name: Option<String>,
    arguments: Vec<Vec<u8>>,
    transient_data: HashMap<String, Vec<u8>>,
    nonce: Option<Vec<u8>>,
}

impl<'a> ProposalBuilder<'a> {
    pub fn new(
        identity: &'a X509Identity,
        signer: &'a dyn Signer,
        channel_id: &str,
        chaincode_name: &str,
    ) -> Self {
        ProposalBuilder {
            identity,
            signer,
            channel_id: channel_id.to_string(),
            chaincode_name: chaincode_name.to_string(),
            transaction_name: None,
            arguments: Vec::new(),
            transient_data: HashMap::new(),
            nonce: None,
        }
    }

    pub fn with_transaction_name(mut self, transaction_name: &str) -> Self {
        self.transaction_name = Some(transaction_name.to_string());
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<Vec<u8>>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_transient_data(mut self, transient_data: HashMap<String, Vec<u8>>) -> Self {
        self.transient_data = transient_data;
        self
    }

    #[cfg(test)]
    fn with_nonce(mut self, nonce: Vec<u8>) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn build(self) -> Result<PreparedProposal, GatewayError> {
        let transaction_name = self.transaction_name.ok_or_else(|| {
            GatewayError::InvalidArgument("a transaction name is required".to_string())
        })?;
        if self.channel_id.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "a channel name is required".to_string(),
            ));
        }
        if self.chaincode_name.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "a chaincode name is required".to_string(),
            ));
        }

        let creator = self.identity.serialize()?;
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => {
                let mut nonce = vec![0; NONCE_LENGTH];
                rand_bytes(&mut nonce)?;
                nonce
            }
        };
        let transaction_id = transaction_id(&nonce, &creator)?;

        let chaincode_id = ChaincodeId {
            name: self.chaincode_name,
            ..Default::default()
        };

        let channel_header = ChannelHeader {
            r#type: HEADER_TYPE_ENDORSER_TRANSACTION,
            timestamp: Some(prost_types::Timestamp::from(SystemTime::now())),
            channel_id: self.channel_id.clone(),
            tx_id: transaction_id.clone(),
            extension: ChaincodeHeaderExtension {
                chaincode_id: Some(chaincode_id.clone()),
            }
            .encode_to_vec(),
            ..Default::default()
        };

        let header = Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: SignatureHeader { creator, nonce }.encode_to_vec(),
        };

        let mut args = Vec::with_capacity(self.arguments.len() + 1);
        args.push(transaction_name.into_bytes());
        args.extend(self.arguments);

        let invocation_spec = ChaincodeInvocationSpec {
            chaincode_spec: Some(ChaincodeSpec {
                r#type: ChaincodeType::Undefined as i32,
                chaincode_id: Some(chaincode_id),
                input: Some(ChaincodeInput {
                    args,
                    ..Default::default()
                }),
                timeout: 0,
            }),
        };

        let proposal = Proposal {
            header: header.encode_to_vec(),
            payload: ChaincodeProposalPayload {
                input: invocation_spec.encode_to_vec(),
                transient_map: self.transient_data,
            }
            .encode_to_vec(),
            extension: Vec::new(),
        };

        let proposal_bytes = proposal.encode_to_vec();
        let digest = hash(MessageDigest::sha256(), &proposal_bytes)?;
        let signature = self.signer.sign(&digest)?;

        trace!("Built proposal for transaction {}", transaction_id);

        Ok(PreparedProposal {
            transaction_id,
            channel_id: self.channel_id,
            signed_proposal: SignedProposal {
                proposal_bytes,
                signature,
            },
        })
    }
}

/// Derives a transaction ID: the hex encoded SHA-256 of the nonce followed by the creator.
pub fn transaction_id(nonce: &[u8], creator: &[u8]) -> Result<String, GatewayError> {
    let mut salted_creator = Vec::with_capacity(nonce.len() + creator.len());
    salted_creator.extend_from_slice(nonce);
    salted_creator.extend_from_slice(creator);

    Ok(hex::encode(hash(MessageDigest::sha256(), &salted_creator)?))
}
