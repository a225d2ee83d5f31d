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

use std::fs;
use std::path::Path;
use std::time::Duration;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use crate::error::GatewayError;
use crate::identity::certificate_from_pem;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS settings for a gateway connection.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsOptions {
    ca_certificate_pem: Vec<u8>,
    server_name_override: Option<String>,
}

impl TlsOptions {
    /// Trusts only the given PEM encoded CA certificate.
    pub fn new(ca_certificate_pem: Vec<u8>) -> Result<Self, GatewayError> {
        certificate_from_pem(&ca_certificate_pem)?;

        Ok(TlsOptions {
            ca_certificate_pem,
            server_name_override: None,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let pem = fs::read(path).map_err(|err| GatewayError::io(path, err))?;

        TlsOptions::new(pem).map_err(|err| match err {
            GatewayError::Identity(msg) => {
                GatewayError::Identity(format!("{}: {}", path.display(), msg))
            }
            err => err,
        })
    }

    /// Verifies the server certificate against this name rather than the address' host.
    ///
    /// An empty override is ignored.
    pub fn with_server_name_override(mut self, server_name: &str) -> Self {
        if !server_name.is_empty() {
            self.server_name_override = Some(server_name.to_string());
        }
        self
    }

    pub fn server_name_override(&self) -> Option<&str> {
        self.server_name_override.as_deref()
    }

    pub fn ca_certificate_pem(&self) -> &[u8] {
        &self.ca_certificate_pem
    }
}

/// Where and how to reach a gateway peer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    address: String,
    tls: Option<TlsOptions>,
    connect_timeout: Duration,
}

impl ConnectionOptions {
    /// Accepts `host:port` or a `grpc://`, `grpcs://`, `http://` or `https://` URL.
    pub fn new(address: &str) -> Self {
        ConnectionOptions {
            address: address.trim().to_string(),
            tls: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn tls(&self) -> Option<&TlsOptions> {
        self.tls.as_ref()
    }

    /// The URI handed to the gRPC transport.
    pub fn uri(&self) -> Result<String, GatewayError> {
        let (secure_scheme, authority) = match self.address.split_once("://") {
            Some((scheme, authority)) => match scheme {
                "grpcs" | "https" => (true, authority),
                "grpc" | "http" => (false, authority),
                _ => {
                    return Err(GatewayError::InvalidArgument(format!(
                        "unsupported gateway address scheme: {}",
                        scheme
                    )))
                }
            },
            None => (false, self.address.as_str()),
        };

        let authority = authority.trim_end_matches('/');
        if authority.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "a gateway address is required".to_string(),
            ));
        }

        if secure_scheme && self.tls.is_none() {
            return Err(GatewayError::InvalidArgument(format!(
                "a TLS certificate is required to connect to {}",
                self.address
            )));
        }

        let scheme = if self.tls.is_some() { "https" } else { "http" };

        Ok(format!("{}://{}", scheme, authority))
    }

    /// Opens the gRPC channel, failing if the peer cannot be reached.
    pub(crate) async fn connect(&self) -> Result<Channel, GatewayError> {
        let uri = self.uri()?;
        let mut endpoint = Endpoint::from_shared(uri.clone())?.connect_timeout(self.connect_timeout);

        if let Some(tls) = &self.tls {
            let mut tls_config = ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(&tls.ca_certificate_pem));
            if let Some(server_name) = &tls.server_name_override {
                tls_config = tls_config.domain_name(server_name.clone());
            }
            endpoint = endpoint.tls_config(tls_config)?;
        }

        debug!("Connecting to gateway at {}", uri);

        Ok(endpoint.connect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::io::Write;

    use tempdir::TempDir;

    use crate::identity::tests::generate_credentials;

    fn tls() -> TlsOptions {
        let (cert_pem, _) = generate_credentials();
        TlsOptions::new(cert_pem).unwrap()
    }

    #[test]
    fn test_plaintext_uri() {
        assert_eq!(
            ConnectionOptions::new("localhost:7051").uri().unwrap(),
            "http://localhost:7051"
        );
        assert_eq!(
            ConnectionOptions::new("grpc://peer0.org1.example.com:7051/")
                .uri()
                .unwrap(),
            "http://peer0.org1.example.com:7051"
        );
    }

    #[test]
    fn test_tls_uri() {
        assert_eq!(
            ConnectionOptions::new("localhost:7051")
                .with_tls(tls())
                .uri()
                .unwrap(),
            "https://localhost:7051"
        );
        assert_eq!(
            ConnectionOptions::new("grpcs://localhost:7051")
                .with_tls(tls())
                .uri()
                .unwrap(),
            "https://localhost:7051"
        );
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(ConnectionOptions::new("").uri().is_err());
        assert!(ConnectionOptions::new("grpcs://").uri().is_err());
        assert!(ConnectionOptions::new("ftp://localhost:7051").uri().is_err());
        // grpcs without a CA certificate
        assert!(ConnectionOptions::new("grpcs://localhost:7051")
            .uri()
            .is_err());
    }

    #[test]
    fn test_server_name_override() {
        let named = tls().with_server_name_override("peer0.org1.example.com");
        assert_eq!(named.server_name_override(), Some("peer0.org1.example.com"));

        assert_eq!(tls().with_server_name_override("").server_name_override(), None);
    }

    #[test]
    fn test_tls_from_file() {
        let temp_dir = TempDir::new("test_tls_from_file").unwrap();
        let (cert_pem, _) = generate_credentials();
        let path = temp_dir.path().join("ca.pem");
        File::create(&path).unwrap().write_all(&cert_pem).unwrap();

        assert_eq!(
            TlsOptions::from_file(&path).unwrap().ca_certificate_pem(),
            cert_pem.as_slice()
        );

        let missing = temp_dir.path().join("missing.pem");
        assert!(TlsOptions::from_file(&missing)
            .unwrap_err()
            .to_string()
            .contains("missing.pem"));
    }

    #[test]
    fn test_connect_refused() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        // port 1 is reserved and nothing listens on it in the test environment
        let options =
            ConnectionOptions::new("127.0.0.1:1").with_connect_timeout(Duration::from_secs(2));
        match runtime.block_on(options.connect()) {
            Err(GatewayError::Transport(_)) => (),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
