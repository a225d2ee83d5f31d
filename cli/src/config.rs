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

use clap::{App, Arg, ArgMatches};

use crate::error::CliError;

const APP_NAME: &str = "ccmetadata";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable consumed by Fabric discovery clients.
pub const DISCOVERY_AS_LOCALHOST: &str = "DISCOVERY_AS_LOCALHOST";

const AFTER_HELP: &str = r"ENV:
    DISCOVERY_AS_LOCALHOST   Set to true when --aslocalhost is given";

pub fn build_app<'a, 'b>() -> App<'a, 'b> {
    App::new(APP_NAME)
        .version(VERSION)
        .author("Cargill Incorporated")
        .about("Get metadata for the specified chaincode name")
        .arg(
            Arg::with_name("gateway")
                .long("gateway")
                .short("g")
                .takes_value(true)
                .empty_values(false)
                .required_unless("connection")
                .help("Gateway peer address"),
        )
        .arg(
            Arg::with_name("connection")
                .long("connection")
                .short("p")
                .takes_value(true)
                .empty_values(false)
                .conflicts_with_all(&["gateway", "tlscert", "override"])
                .help("Connection profile file, used instead of --gateway"),
        )
        .arg(
            Arg::with_name("cert")
                .long("cert")
                .short("c")
                .takes_value(true)
                .empty_values(false)
                .required(true)
                .help("Certificate file"),
        )
        .arg(
            Arg::with_name("key")
                .long("key")
                .short("k")
                .takes_value(true)
                .empty_values(false)
                .required(true)
                .help("Private key file"),
        )
        .arg(
            Arg::with_name("mspid")
                .long("mspid")
                .short("m")
                .takes_value(true)
                .empty_values(false)
                .required(true)
                .help("Membership service provider name, e.g. Org1MSP"),
        )
        .arg(
            Arg::with_name("channel")
                .long("channel")
                .short("n")
                .takes_value(true)
                .empty_values(false)
                .required(true)
                .help("Channel name, e.g. mychannel"),
        )
        .arg(
            Arg::with_name("tlscert")
                .long("tlscert")
                .short("t")
                .takes_value(true)
                .empty_values(false)
                .help("TLS certificate file"),
        )
        .arg(
            Arg::with_name("override")
                .long("override")
                .short("o")
                .takes_value(true)
                .help("Server name override"),
        )
        .arg(
            Arg::with_name("aslocalhost")
                .long("aslocalhost")
                .short("l")
                .help("Use discovery service as localhost"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Enable verbose logging"),
        )
        .arg(
            Arg::with_name("chaincode")
                .index(1)
                .required(true)
                .empty_values(false)
                .help("Chaincode name"),
        )
        .after_help(AFTER_HELP)
}

/// How the gateway peer is located.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStyle {
    /// A gRPC connection to the given address, secured with TLS when a CA certificate is given.
    Direct {
        gateway_address: String,
        tls_cert_path: Option<String>,
        server_name_override: Option<String>,
    },
    /// A peer of the client's organization taken from a connection profile.
    Profile { connection_profile_path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataConfig {
    pub connection: ConnectionStyle,
    pub cert_path: String,
    pub key_path: String,
    pub msp_id: String,
    pub channel_name: String,
    pub chaincode_name: String,
    pub as_localhost: bool,
    pub verbose: bool,
}

impl MetadataConfig {
    pub fn from_args(args: &ArgMatches) -> Result<Self, CliError> {
        let connection = match args.value_of("connection") {
            Some(path) => ConnectionStyle::Profile {
                connection_profile_path: path.to_string(),
            },
            None => ConnectionStyle::Direct {
                gateway_address: required_value(args, "gateway")?,
                tls_cert_path: args.value_of("tlscert").map(String::from),
                server_name_override: args
                    .value_of("override")
                    .filter(|name| !name.is_empty())
                    .map(String::from),
            },
        };

        Ok(MetadataConfig {
            connection,
            cert_path: required_value(args, "cert")?,
            key_path: required_value(args, "key")?,
            msp_id: required_value(args, "mspid")?,
            channel_name: required_value(args, "channel")?,
            chaincode_name: required_value(args, "chaincode")?,
            as_localhost: args.is_present("aslocalhost"),
            verbose: args.is_present("verbose"),
        })
    }

    /// The resolved parameters, one line each, as echoed in verbose mode.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.connection {
            ConnectionStyle::Direct {
                gateway_address,
                tls_cert_path,
                server_name_override,
            } => {
                lines.push(format!("Gateway address: {}", gateway_address));
                lines.push(format!("Certificate file: {}", self.cert_path));
                lines.push(format!("Private key file: {}", self.key_path));
                lines.push(format!("MSP ID: {}", self.msp_id));
                lines.push(format!("Channel name: {}", self.channel_name));
                lines.push(format!(
                    "TLS certificate file: {}",
                    tls_cert_path.as_deref().unwrap_or("")
                ));
                lines.push(format!(
                    "Server name override: {}",
                    server_name_override.as_deref().unwrap_or("")
                ));
            }
            ConnectionStyle::Profile {
                connection_profile_path,
            } => {
                lines.push(format!("Connection profile: {}", connection_profile_path));
                lines.push(format!("Certificate file: {}", self.cert_path));
                lines.push(format!("Private key file: {}", self.key_path));
                lines.push(format!("MSP ID: {}", self.msp_id));
                lines.push(format!("Channel name: {}", self.channel_name));
            }
        }
        lines.push(format!("As localhost option: {}", self.as_localhost));
        lines.push(format!("Chaincode name: {}", self.chaincode_name));
        lines
    }

    /// The environment variable to set before connecting, if any.
    pub fn discovery_environment(&self) -> Option<(&'static str, &'static str)> {
        if self.as_localhost {
            Some((DISCOVERY_AS_LOCALHOST, "true"))
        } else {
            None
        }
    }
}

fn required_value(args: &ArgMatches, name: &str) -> Result<String, CliError> {
    args.value_of(name)
        .map(String::from)
        .ok_or_else(|| CliError::UsageError(format!("flag required but not provided: --{}", name)))
}
