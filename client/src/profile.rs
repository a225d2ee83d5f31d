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

//! Fabric common connection profiles.
//!
//! A profile describes the organizations and peers of a network. Only the parts needed to pick a
//! gateway peer for the client's organization are read; everything else in the file is ignored.
//! Profiles may be written in YAML or JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::connection::{ConnectionOptions, TlsOptions};
use crate::error::GatewayError;

const LOCALHOST: &str = "localhost";
const SERVER_NAME_OPTIONS: [&str; 2] = ["ssl-target-name-override", "hostnameOverride"];

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client: Option<ClientConfig>,
    #[serde(default)]
    pub organizations: BTreeMap<String, OrganizationConfig>,
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationConfig {
    pub mspid: String,
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeerConfig {
    pub url: String,
    #[serde(rename = "tlsCACerts", default)]
    pub tls_ca_certs: Option<TlsCaCerts>,
    #[serde(rename = "grpcOptions", default)]
    pub grpc_options: BTreeMap<String, serde_yaml::Value>,
}

/// A CA certificate given inline or as a path relative to the profile.
#[derive(Debug, Default, Deserialize)]
pub struct TlsCaCerts {
    #[serde(default)]
    pub pem: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ConnectionProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| GatewayError::io(path, err))?;

        let mut profile = contents
            .parse::<ConnectionProfile>()
            .map_err(|err| GatewayError::Profile(format!("{}: {}", path.display(), err)))?;
        profile.base_dir = path.parent().map(Path::to_path_buf);

        Ok(profile)
    }

    /// Resolves the gateway peer for the organization of `msp_id`.
    ///
    /// The organization whose `mspid` matches is preferred, falling back to the profile's client
    /// organization. Its first peer is used. With `as_localhost` the peer's host is replaced by
    /// `localhost`, and the original host is kept as the TLS server name unless the profile
    /// overrides it.
    pub fn gateway_endpoint(
        &self,
        msp_id: &str,
        as_localhost: bool,
    ) -> Result<ConnectionOptions, GatewayError> {
        let organization = self.organization(msp_id)?;

        let peer_name = organization.peers.first().ok_or_else(|| {
            GatewayError::Profile(format!("organization {} has no peers", organization.mspid))
        })?;
        let peer = self
            .peers
            .get(peer_name)
            .ok_or_else(|| GatewayError::Profile(format!("peer not defined: {}", peer_name)))?;

        let (scheme, authority) = match peer.url.split_once("://") {
            Some((scheme, authority)) => (Some(scheme), authority.trim_end_matches('/')),
            None => (None, peer.url.trim_end_matches('/')),
        };
        let (host, port) = split_host_port(authority);
        if host.is_empty() {
            return Err(GatewayError::Profile(format!(
                "peer {} has an invalid url: {}",
                peer_name, peer.url
            )));
        }

        let connect_host = if as_localhost { LOCALHOST } else { host };
        let mut address = match port {
            Some(port) => format!("{}:{}", connect_host, port),
            None => connect_host.to_string(),
        };
        if let Some(scheme) = scheme {
            address = format!("{}://{}", scheme, address);
        }

        debug!("Using peer {} at {}", peer_name, address);

        let mut options = ConnectionOptions::new(&address);

        if let Some(tls) = self.tls_options(peer_name, peer, scheme)? {
            let server_name = match self.server_name_override(peer) {
                Some(name) => name,
                None if as_localhost => host
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .to_string(),
                None => String::new(),
            };
            options = options.with_tls(tls.with_server_name_override(&server_name));
        }

        Ok(options)
    }

    fn organization(&self, msp_id: &str) -> Result<&OrganizationConfig, GatewayError> {
        if let Some(organization) = self
            .organizations
            .values()
            .find(|organization| organization.mspid == msp_id)
        {
            return Ok(organization);
        }

        self.client
            .as_ref()
            .and_then(|client| client.organization.as_ref())
            .and_then(|name| self.organizations.get(name))
            .ok_or_else(|| {
                GatewayError::Profile(format!("no organization found for MSP ID {}", msp_id))
            })
    }

    fn tls_options(
        &self,
        peer_name: &str,
        peer: &PeerConfig,
        scheme: Option<&str>,
    ) -> Result<Option<TlsOptions>, GatewayError> {
        let secure = matches!(scheme, Some("grpcs") | Some("https"));

        let ca_certs = match (&peer.tls_ca_certs, secure) {
            (Some(ca_certs), true) => ca_certs,
            (None, true) => {
                return Err(GatewayError::Profile(format!(
                    "peer {} uses TLS but has no tlsCACerts",
                    peer_name
                )))
            }
            (_, false) => return Ok(None),
        };

        match (&ca_certs.pem, &ca_certs.path) {
            (Some(pem), _) => TlsOptions::new(pem.as_bytes().to_vec()).map(Some),
            (None, Some(path)) => TlsOptions::from_file(self.resolve_path(path)).map(Some),
            (None, None) => Err(GatewayError::Profile(format!(
                "tlsCACerts for peer {} must contain pem or path",
                peer_name
            ))),
        }
    }

    fn server_name_override(&self, peer: &PeerConfig) -> Option<String> {
        SERVER_NAME_OPTIONS
            .iter()
            .filter_map(|option| peer.grpc_options.get(*option))
            .filter_map(serde_yaml::Value::as_str)
            .find(|name| !name.is_empty())
            .map(ToString::to_string)
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base_dir) if path.is_relative() => base_dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FromStr for ConnectionProfile {
    type Err = GatewayError;

    /// Parses a profile written in YAML or JSON.
    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(contents).map_err(|err| GatewayError::Profile(err.to_string()))
    }
}

/// Splits `host[:port]`. A colon only starts the port when it is followed by digits alone and the
/// host is a name, an IPv4 address or a bracketed IPv6 literal.
fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if let Some((host, port)) = authority.rsplit_once(':') {
        let numeric_port = !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit());
        let plain_host = !host.contains(':') || (host.starts_with('[') && host.ends_with(']'));
        if numeric_port && plain_host {
            return (host, Some(port));
        }
    }

    (authority, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempdir::TempDir;

    use crate::identity::tests::generate_credentials;

    fn indent(pem: &[u8], spaces: usize) -> String {
        String::from_utf8(pem.to_vec())
            .unwrap()
            .lines()
            .map(|line| format!("{}{}\n", " ".repeat(spaces), line))
            .collect()
    }

    fn yaml_profile(ca_pem: &[u8]) -> String {
        format!(
            r#"---
name: test-network-org1
version: 1.0.0
client:
  organization: Org1
organizations:
  Org1:
    mspid: Org1MSP
    peers:
    - peer0.org1.example.com
  Org2:
    mspid: Org2MSP
    peers:
    - peer0.org2.example.com
peers:
  peer0.org1.example.com:
    url: grpcs://peer0.org1.example.com:7051
    tlsCACerts:
      pem: |
{}    grpcOptions:
      ssl-target-name-override: peer0.org1.example.com
  peer0.org2.example.com:
    url: grpc://peer0.org2.example.com:9051
"#,
            indent(ca_pem, 8)
        )
    }

    #[test]
    fn test_tls_peer_from_yaml() {
        let (ca_pem, _) = generate_credentials();
        let profile = ConnectionProfile::from_str(&yaml_profile(&ca_pem)).unwrap();
        assert_eq!(profile.name, "test-network-org1");

        let options = profile.gateway_endpoint("Org1MSP", false).unwrap();
        assert_eq!(options.address(), "grpcs://peer0.org1.example.com:7051");
        assert_eq!(options.uri().unwrap(), "https://peer0.org1.example.com:7051");

        let tls = options.tls().unwrap();
        assert_eq!(tls.server_name_override(), Some("peer0.org1.example.com"));
        assert_eq!(tls.ca_certificate_pem(), ca_pem.as_slice());
    }

    #[test]
    fn test_as_localhost_rewrites_host() {
        let (ca_pem, _) = generate_credentials();
        let profile = ConnectionProfile::from_str(&yaml_profile(&ca_pem)).unwrap();

        let options = profile.gateway_endpoint("Org1MSP", true).unwrap();
        assert_eq!(options.address(), "grpcs://localhost:7051");
        assert_eq!(
            options.tls().unwrap().server_name_override(),
            Some("peer0.org1.example.com")
        );

        let options = profile.gateway_endpoint("Org2MSP", true).unwrap();
        assert_eq!(options.address(), "grpc://localhost:9051");
        assert!(options.tls().is_none());
    }

    #[test]
    fn test_json_profile_falls_back_to_client_organization() {
        let profile = ConnectionProfile::from_str(
            r#"{
                "name": "test-network",
                "client": {"organization": "Org1"},
                "organizations": {
                    "Org1": {"mspid": "Org1MSP", "peers": ["peer0"]}
                },
                "peers": {
                    "peer0": {"url": "grpc://peer0.org1.example.com:7051"}
                }
            }"#,
        )
        .unwrap();

        let options = profile.gateway_endpoint("UnknownMSP", false).unwrap();
        assert_eq!(options.address(), "grpc://peer0.org1.example.com:7051");
    }

    #[test]
    fn test_tls_ca_path_relative_to_profile() {
        let temp_dir = TempDir::new("test_tls_ca_path_relative_to_profile").unwrap();
        let (ca_pem, _) = generate_credentials();
        File::create(temp_dir.path().join("ca.pem"))
            .unwrap()
            .write_all(&ca_pem)
            .unwrap();

        let profile_path = temp_dir.path().join("connection.yaml");
        File::create(&profile_path)
            .unwrap()
            .write_all(
                br#"
organizations:
  Org1:
    mspid: Org1MSP
    peers: [peer0]
peers:
  peer0:
    url: grpcs://peer0.org1.example.com:7051
    tlsCACerts:
      path: ca.pem
"#,
            )
            .unwrap();

        let profile = ConnectionProfile::from_file(&profile_path).unwrap();
        let options = profile.gateway_endpoint("Org1MSP", false).unwrap();

        let tls = options.tls().unwrap();
        assert_eq!(tls.ca_certificate_pem(), ca_pem.as_slice());
        assert_eq!(tls.server_name_override(), None);
    }

    #[test]
    fn test_unresolvable_profiles() {
        let no_org = ConnectionProfile::from_str("name: empty").unwrap();
        assert!(no_org.gateway_endpoint("Org1MSP", false).is_err());

        let missing_peer = ConnectionProfile::from_str(
            "organizations: {Org1: {mspid: Org1MSP, peers: [peer0]}}",
        )
        .unwrap();
        assert!(missing_peer.gateway_endpoint("Org1MSP", false).is_err());

        let missing_ca = ConnectionProfile::from_str(
            "organizations: {Org1: {mspid: Org1MSP, peers: [peer0]}}\n\
             peers: {peer0: {url: 'grpcs://peer0:7051'}}",
        )
        .unwrap();
        assert!(missing_ca.gateway_endpoint("Org1MSP", false).is_err());

        assert!(ConnectionProfile::from_str("organizations: [").is_err());
    }

    #[test]
    fn test_missing_profile_file() {
        let temp_dir = TempDir::new("test_missing_profile_file").unwrap();
        let missing = temp_dir.path().join("missing.yaml");

        match ConnectionProfile::from_file(&missing) {
            Err(GatewayError::Io { path, .. }) => assert_eq!(path, missing),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("loaded a missing profile"),
        }
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("peer0.org1.example.com:7051"),
            ("peer0.org1.example.com", Some("7051"))
        );
        assert_eq!(split_host_port("peer0"), ("peer0", None));
        assert_eq!(split_host_port("[::1]:7051"), ("[::1]", Some("7051")));
        assert_eq!(split_host_port("[::1]"), ("[::1]", None));
        assert_eq!(split_host_port("::1"), ("::1", None));
    }

    #[test]
    fn test_as_localhost_with_ipv6_peer() {
        let (ca_pem, _) = generate_credentials();
        let profile = format!(
            r#"
organizations:
  Org1:
    mspid: Org1MSP
    peers: [bare, ported]
  Org2:
    mspid: Org2MSP
    peers: [ported]
peers:
  bare:
    url: grpcs://[::1]
    tlsCACerts:
      pem: |
{}  ported:
    url: grpc://[::1]:7051
"#,
            indent(&ca_pem, 8)
        )
        .parse::<ConnectionProfile>()
        .unwrap();

        let options = profile.gateway_endpoint("Org1MSP", true).unwrap();
        assert_eq!(options.address(), "grpcs://localhost");
        assert_eq!(options.tls().unwrap().server_name_override(), Some("::1"));

        let options = profile.gateway_endpoint("Org2MSP", true).unwrap();
        assert_eq!(options.address(), "grpc://localhost:7051");

        let options = profile.gateway_endpoint("Org2MSP", false).unwrap();
        assert_eq!(options.address(), "grpc://[::1]:7051");
    }
}
