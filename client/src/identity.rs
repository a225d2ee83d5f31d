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

//! Client identities and the signing capability used to endorse proposals.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::EcKey;
use openssl::ecdsa::EcdsaSig;
use openssl::pkey::{Id, PKey, Private};
use openssl::x509::X509;
use prost::Message;

use crate::error::GatewayError;
use crate::protos::SerializedIdentity;

/// An X.509 certificate bound to the membership service provider that issued it.
#[derive(Clone)]
pub struct X509Identity {
    msp_id: String,
    certificate: X509,
}

impl X509Identity {
    pub fn new(msp_id: &str, certificate: X509) -> Result<Self, GatewayError> {
        if msp_id.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "MSP ID must not be empty".to_string(),
            ));
        }

        Ok(X509Identity {
            msp_id: msp_id.to_string(),
            certificate,
        })
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// The PEM encoded certificate, as presented to the network.
    pub fn credentials(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(self.certificate.to_pem()?)
    }

    /// Encodes the identity as an `msp.SerializedIdentity`, the creator of signed proposals.
    pub fn serialize(&self) -> Result<Vec<u8>, GatewayError> {
        let serialized = SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.credentials()?,
        };

        Ok(serialized.encode_to_vec())
    }
}

/// Produces a signature over a message digest.
pub trait Signer {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, GatewayError>;
}

/// Signs digests with an ECDSA private key.
///
/// Signatures are DER encoded and use the low-S form required by Fabric peers.
pub struct PrivateKeySigner {
    key: EcKey<Private>,
}

impl PrivateKeySigner {
    pub fn from_pem(pem: &[u8]) -> Result<Self, GatewayError> {
        let key = PKey::private_key_from_pem(pem).map_err(|err| {
            GatewayError::Identity(format!(
                "failed to create private key from file contents: {}",
                err
            ))
        })?;

        if key.id() != Id::EC {
            return Err(GatewayError::Identity(format!(
                "unsupported private key type: {:?}",
                key.id()
            )));
        }

        Ok(PrivateKeySigner {
            key: key.ec_key()?,
        })
    }

    pub fn private_key_pem(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(PKey::from_ec_key(self.key.clone())?.private_key_to_pem_pkcs8()?)
    }
}

impl Signer for PrivateKeySigner {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let signature = EcdsaSig::sign(digest, &self.key)?;

        let mut ctx = BigNumContext::new()?;
        let mut order = BigNum::new()?;
        self.key.group().order(&mut order, &mut ctx)?;
        let mut half_order = BigNum::new()?;
        half_order.rshift1(&order)?;

        let s = if signature.s().ucmp(&half_order) == Ordering::Greater {
            let mut low_s = BigNum::new()?;
            low_s.checked_sub(&order, signature.s())?;
            low_s
        } else {
            signature.s().to_owned()?
        };

        let normalized = EcdsaSig::from_private_components(signature.r().to_owned()?, s)?;

        Ok(normalized.to_der()?)
    }
}

/// Parses a PEM encoded X.509 certificate.
pub fn certificate_from_pem(pem: &[u8]) -> Result<X509, GatewayError> {
    X509::from_pem(pem).map_err(|err| {
        GatewayError::Identity(format!(
            "failed to create certificate from file contents: {}",
            err
        ))
    })
}

/// Loads a certificate from a PEM file.
pub fn load_certificate<P: AsRef<Path>>(path: P) -> Result<X509, GatewayError> {
    let path = path.as_ref();
    let pem = fs::read(path).map_err(|err| GatewayError::io(path, err))?;

    certificate_from_pem(&pem).map_err(|err| match err {
        GatewayError::Identity(msg) => GatewayError::Identity(format!("{}: {}", path.display(), msg)),
        err => err,
    })
}

/// Loads an ECDSA signer from a PEM private key file.
pub fn load_private_key_signer<P: AsRef<Path>>(path: P) -> Result<PrivateKeySigner, GatewayError> {
    let path = path.as_ref();
    let pem = fs::read(path).map_err(|err| GatewayError::io(path, err))?;

    PrivateKeySigner::from_pem(&pem).map_err(|err| match err {
        GatewayError::Identity(msg) => GatewayError::Identity(format!("{}: {}", path.display(), msg)),
        err => err,
    })
}
