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

//! An in-memory wallet of labelled client identities.

use std::collections::HashMap;

use crate::error::GatewayError;
use crate::identity::{certificate_from_pem, PrivateKeySigner, X509Identity};

/// The credentials of a single X.509 identity held in a wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletIdentity {
    msp_id: String,
    certificate_pem: Vec<u8>,
    private_key_pem: Vec<u8>,
}

impl WalletIdentity {
    /// Validates and stores the PEM encoded certificate and private key.
    pub fn new(
        msp_id: &str,
        certificate_pem: &[u8],
        private_key_pem: &[u8],
    ) -> Result<Self, GatewayError> {
        let identity = WalletIdentity {
            msp_id: msp_id.to_string(),
            certificate_pem: certificate_pem.to_vec(),
            private_key_pem: private_key_pem.to_vec(),
        };
        identity.to_parts()?;

        Ok(identity)
    }

    /// Stores an already loaded identity and signer.
    pub fn from_parts(
        identity: &X509Identity,
        signer: &PrivateKeySigner,
    ) -> Result<Self, GatewayError> {
        Ok(WalletIdentity {
            msp_id: identity.msp_id().to_string(),
            certificate_pem: identity.credentials()?,
            private_key_pem: signer.private_key_pem()?,
        })
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn to_parts(&self) -> Result<(X509Identity, PrivateKeySigner), GatewayError> {
        let identity =
            X509Identity::new(&self.msp_id, certificate_from_pem(&self.certificate_pem)?)?;
        let signer = PrivateKeySigner::from_pem(&self.private_key_pem)?;

        Ok((identity, signer))
    }
}

#[derive(Debug, Default)]
pub struct Wallet {
    identities: HashMap<String, WalletIdentity>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an identity, replacing any existing identity with the same label.
    pub fn put(&mut self, label: &str, identity: WalletIdentity) {
        self.identities.insert(label.to_string(), identity);
    }

    pub fn get(&self, label: &str) -> Option<&WalletIdentity> {
        self.identities.get(label)
    }

    pub fn remove(&mut self, label: &str) -> Option<WalletIdentity> {
        self.identities.remove(label)
    }

    /// The labels of all stored identities, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.identities.keys().cloned().collect();
        labels.sort();
        labels
    }
}
