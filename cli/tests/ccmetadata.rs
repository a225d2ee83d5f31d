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

extern crate assert_cmd;

use assert_cmd::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use openssl::asn1::Asn1Time;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::{X509NameBuilder, X509};
use tempdir::TempDir;

mod integration {
    use super::*;

    /// Verifies that `ccmetadata` without a chaincode name exits with a usage error.
    #[test]
    fn test_missing_chaincode() {
        let output = make_ccmetadata_command()
            .args(&[
                "--cert=cert.pem",
                "--key=key.pem",
                "--mspid=Org1MSP",
                "--channel=mychannel",
                "--gateway=localhost:7051",
            ])
            .assert()
            .failure()
            .code(2)
            .get_output()
            .clone();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("<chaincode>"), "stderr: {}", stderr);
        assert!(stderr.contains("USAGE"), "stderr: {}", stderr);
        assert!(output.stdout.is_empty());
    }

    /// Verifies that leaving out any required flag exits with a usage error.
    #[test]
    fn test_missing_required_flags() {
        let all = [
            "--cert=cert.pem",
            "--key=key.pem",
            "--mspid=Org1MSP",
            "--channel=mychannel",
            "--gateway=localhost:7051",
        ];

        for missing in all.iter() {
            let args: Vec<&str> = all
                .iter()
                .filter(|arg| arg != &missing)
                .copied()
                .chain(std::iter::once("asset-transfer"))
                .collect();

            let output = make_ccmetadata_command()
                .args(&args)
                .assert()
                .failure()
                .code(2)
                .get_output()
                .clone();

            assert!(
                !output.stderr.is_empty(),
                "no usage printed without {}",
                missing
            );
            assert!(output.stdout.is_empty());
        }
    }

    /// Verifies that an unreadable certificate is reported by path and nothing is printed.
    #[test]
    fn test_missing_certificate_file() {
        let temp_dir = TempDir::new("test_missing_certificate_file").unwrap();
        let (_, key_path) = write_credentials(temp_dir.path());
        let cert_path = temp_dir.path().join("does-not-exist.pem");

        let output = make_ccmetadata_command()
            .arg(format!("--cert={}", cert_path.display()))
            .arg(format!("--key={}", key_path.display()))
            .args(&[
                "--mspid=Org1MSP",
                "--channel=mychannel",
                "--gateway=localhost:7051",
                "asset-transfer",
            ])
            .assert()
            .failure()
            .code(1)
            .get_output()
            .clone();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("does-not-exist.pem"), "stderr: {}", stderr);
        assert!(output.stdout.is_empty());
    }

    /// Verifies that a malformed private key is reported by path.
    #[test]
    fn test_malformed_private_key() {
        let temp_dir = TempDir::new("test_malformed_private_key").unwrap();
        let (cert_path, _) = write_credentials(temp_dir.path());
        let key_path = temp_dir.path().join("garbage_sk");
        File::create(&key_path)
            .unwrap()
            .write_all(b"not a private key")
            .unwrap();

        let output = make_ccmetadata_command()
            .arg(format!("--cert={}", cert_path.display()))
            .arg(format!("--key={}", key_path.display()))
            .args(&[
                "--mspid=Org1MSP",
                "--channel=mychannel",
                "--gateway=localhost:7051",
                "asset-transfer",
            ])
            .assert()
            .failure()
            .get_output()
            .clone();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("garbage_sk"), "stderr: {}", stderr);
        assert!(output.stdout.is_empty());
    }

    /// Verifies that an unreachable gateway fails without printing a result.
    #[test]
    fn test_unreachable_gateway() {
        let temp_dir = TempDir::new("test_unreachable_gateway").unwrap();
        let (cert_path, key_path) = write_credentials(temp_dir.path());

        let output = make_ccmetadata_command()
            .arg(format!("--cert={}", cert_path.display()))
            .arg(format!("--key={}", key_path.display()))
            .args(&[
                "--mspid=Org1MSP",
                "--channel=mychannel",
                "--gateway=127.0.0.1:1",
                "asset-transfer",
            ])
            .assert()
            .failure()
            .code(1)
            .get_output()
            .clone();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("failed to connect to Fabric Gateway"),
            "stderr: {}",
            stderr
        );
        assert!(output.stdout.is_empty());
    }

    /// Verifies that `--verbose` echoes the resolved parameters before failing.
    #[test]
    fn test_verbose_echo() {
        let temp_dir = TempDir::new("test_verbose_echo").unwrap();
        let cert_path = temp_dir.path().join("does-not-exist.pem");

        let output = make_ccmetadata_command()
            .arg(format!("--cert={}", cert_path.display()))
            .args(&[
                "--key=key.pem",
                "--mspid=Org1MSP",
                "--channel=mychannel",
                "--gateway=localhost:7051",
                "--aslocalhost",
                "--verbose",
                "asset-transfer",
            ])
            .assert()
            .failure()
            .get_output()
            .clone();

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("MSP ID: Org1MSP"), "stdout: {}", stdout);
        assert!(stdout.contains("As localhost option: true"), "stdout: {}", stdout);
        assert!(stdout.contains("Chaincode name: asset-transfer"), "stdout: {}", stdout);
    }

    /// Verifies that a missing connection profile is reported by path.
    #[test]
    fn test_missing_connection_profile() {
        let temp_dir = TempDir::new("test_missing_connection_profile").unwrap();
        let (cert_path, key_path) = write_credentials(temp_dir.path());
        let profile_path = temp_dir.path().join("connection-org1.yaml");

        let output = make_ccmetadata_command()
            .arg(format!("--cert={}", cert_path.display()))
            .arg(format!("--key={}", key_path.display()))
            .arg(format!("--connection={}", profile_path.display()))
            .args(&["--mspid=Org1MSP", "--channel=mychannel", "asset-transfer"])
            .assert()
            .failure()
            .code(1)
            .get_output()
            .clone();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("connection-org1.yaml"), "stderr: {}", stderr);
    }

    #[test]
    fn test_help() {
        make_ccmetadata_command().arg("--help").assert().success();
    }
}

fn make_ccmetadata_command() -> Command {
    let mut command = Command::cargo_bin("ccmetadata").unwrap();
    command.env_remove("DISCOVERY_AS_LOCALHOST");
    command
}

/// Writes a self-signed P-256 certificate and its private key, returning their paths.
fn write_credentials(dir: &Path) -> (PathBuf, PathBuf) {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "User1@org1.example.com")
        .unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    let cert_path = dir.join("cert.pem");
    File::create(&cert_path)
        .unwrap()
        .write_all(&builder.build().to_pem().unwrap())
        .unwrap();

    let key_path = dir.join("priv_sk");
    File::create(&key_path)
        .unwrap()
        .write_all(&key.private_key_to_pem_pkcs8().unwrap())
        .unwrap();

    (cert_path, key_path)
}
