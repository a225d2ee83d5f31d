// Copyright 2018-2020 Cargill Incorporated
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
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const FORCE_PANDOC: &str = "CCMETADATA_FORCE_PANDOC";
const MAN_DIR: &str = "man";
const OUTPUT_DIR: &str = "packaging/man";

/// Converts the markdown files in man/ into man pages under packaging/man. Generation is skipped
/// when pandoc is not on the PATH, unless CCMETADATA_FORCE_PANDOC=true, in which case the build
/// fails instead.
fn main() -> Result<(), BuildError> {
    println!("cargo:rerun-if-changed={}", MAN_DIR);
    println!("cargo:rerun-if-env-changed={}", FORCE_PANDOC);

    if !pandoc_installed() {
        let force = match env::var(FORCE_PANDOC) {
            Ok(var) => var.parse::<bool>().map_err(|_| {
                BuildError(format!("Unable to read {} environment variable", FORCE_PANDOC))
            })?,
            Err(_) => false,
        };

        if force {
            return Err(BuildError(
                "Cannot generate man pages, pandoc is not installed".into(),
            ));
        }

        println!("Skip generating man pages");
        return Ok(());
    }

    fs::create_dir_all(OUTPUT_DIR)
        .map_err(|err| BuildError(format!("Unable to create {}: {}", OUTPUT_DIR, err)))?;

    for markdown in markdown_files(Path::new(MAN_DIR))? {
        let stem = markdown
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| BuildError("Cannot get markdown file name".into()))?;
        let manpage = format!("{}/{}", OUTPUT_DIR, stem);

        let status = Command::new("pandoc")
            .arg("--standalone")
            .args(&["--to", "man"])
            .arg(&markdown)
            .args(&["-o", &manpage])
            .status()
            .map_err(|err| {
                BuildError(format!("Unable to generate man page: {} {}", manpage, err))
            })?;

        if status.success() {
            println!("Generated man page: {}", manpage);
        } else {
            println!("Unable to generate man page {} status {}", manpage, status);
        }
    }

    Ok(())
}

fn pandoc_installed() -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join("pandoc").is_file()))
        .unwrap_or(false)
}

fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| BuildError(format!("Unable to read man pages directory: {}", err)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| {
                BuildError(format!("Unable to retrieve entries for man pages: {}", err))
            })?
            .path();
        if path.extension().map(|ext| ext == "md").unwrap_or(false) {
            files.push(path);
        }
    }

    Ok(files)
}

pub struct BuildError(String);

impl Error for BuildError {}

// This is the output that will be used for print errors returned from main
impl fmt::Debug for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
