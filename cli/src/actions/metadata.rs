// Copyright 2021 Cargill Incorporated
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

use std::env;
use std::io::Write;
use std::time::Duration;

use fabric_gateway_client::{
    load_certificate, load_private_key_signer, ConnectionOptions, ConnectionProfile, Gateway,
    GatewayBuilder, TlsOptions, Wallet, WalletIdentity, X509Identity,
};

use crate::config::{ConnectionStyle, MetadataConfig};
use crate::error::CliError;

/// The system contract transaction every Fabric chaincode answers with its metadata.
pub const GET_METADATA_TRANSACTION: &str = "org.hyperledger.fabric:GetMetadata";

const EVALUATE_TIMEOUT: Duration = Duration::from_secs(5);
const WALLET_LABEL: &str = "ccmetadata";

/// Retrieves the raw metadata of the configured chaincode.
pub trait MetadataQuery {
    fn get_metadata(&self, config: &MetadataConfig) -> Result<Vec<u8>, CliError>;
}

/// Process-wide settings that must be in place before a connection is opened.
pub trait Environment {
    fn set(&mut self, key: &str, value: &str);
}

pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn set(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
    }
}

/// Queries a Fabric Gateway peer for chaincode metadata.
pub struct GatewayMetadataQuery;

impl GatewayMetadataQuery {
    fn connect(&self, config: &MetadataConfig) -> Result<Gateway, CliError> {
        let certificate = load_certificate(&config.cert_path)?;
        let identity = X509Identity::new(&config.msp_id, certificate)?;
        let signer = load_private_key_signer(&config.key_path)?;

        match &config.connection {
            ConnectionStyle::Direct {
                gateway_address,
                tls_cert_path,
                server_name_override,
            } => {
                let mut options = ConnectionOptions::new(gateway_address);
                match tls_cert_path {
                    Some(tls_cert_path) => {
                        let tls = TlsOptions::from_file(tls_cert_path)?
                            .with_server_name_override(
                                server_name_override.as_deref().unwrap_or(""),
                            );
                        options = options.with_tls(tls);
                    }
                    None if server_name_override.is_some() => {
                        warn!("Ignoring server name override without a TLS certificate");
                    }
                    None => (),
                }

                Gateway::builder(identity, signer)
                    .with_evaluate_timeout(EVALUATE_TIMEOUT)
                    .connect(&options)
                    .map_err(CliError::ConnectionError)
            }
            ConnectionStyle::Profile {
                connection_profile_path,
            } => {
                let profile = ConnectionProfile::from_file(connection_profile_path)?;
                let options = profile.gateway_endpoint(identity.msp_id(), config.as_localhost)?;

                let mut wallet = Wallet::new();
                wallet.put(
                    WALLET_LABEL,
                    WalletIdentity::from_parts(&identity, &signer)?,
                );

                GatewayBuilder::from_wallet(&wallet, WALLET_LABEL)?
                    .with_evaluate_timeout(EVALUATE_TIMEOUT)
                    .connect(&options)
                    .map_err(CliError::ConnectionError)
            }
        }
    }
}

impl MetadataQuery for GatewayMetadataQuery {
    fn get_metadata(&self, config: &MetadataConfig) -> Result<Vec<u8>, CliError> {
        let gateway = self.connect(config)?;

        let result = gateway
            .network(&config.channel_name)
            .contract(&config.chaincode_name)
            .evaluate_transaction(GET_METADATA_TRANSACTION, &[])
            .map_err(CliError::EvaluateError);

        gateway.close();

        result
    }
}

/// Prints the metadata of the configured chaincode to `out` as indented JSON.
///
/// Nothing but the verbose parameter listing is written unless the query and formatting both
/// succeed.
pub fn do_get_metadata(
    config: &MetadataConfig,
    query: &dyn MetadataQuery,
    environment: &mut dyn Environment,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    if config.verbose {
        for line in config.describe() {
            writeln!(out, "{}", line)?;
        }
    }

    if let Some((key, value)) = config.discovery_environment() {
        debug!("Setting {}={}", key, value);
        environment.set(key, value);
    }

    let metadata = query.get_metadata(config)?;
    let formatted = format_json(&metadata)?;

    writeln!(out, "{}", formatted)?;
    out.flush()?;

    Ok(())
}

/// Re-indents a JSON document with two spaces, keeping the original key order.
pub fn format_json(data: &[u8]) -> Result<String, CliError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
