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

#[macro_use]
extern crate log;

mod actions;
mod config;
mod error;

use std::io;

use clap::ErrorKind;
use flexi_logger::{DeferredNow, LogSpecBuilder, Logger};
use log::Record;

use crate::actions::metadata::{self, GatewayMetadataQuery, ProcessEnvironment};
use crate::config::{build_app, MetadataConfig};
use crate::error::CliError;

// Transport crates are noisy at debug level
const QUIET_MODULES: [&str; 5] = ["h2", "hyper", "rustls", "tonic", "tower"];

// log format for cli that will only show the log message
pub fn log_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(w, "{}", record.args(),)
}

fn run() -> Result<(), CliError> {
    let matches = build_app()
        .get_matches_safe()
        .or_else(|err| match err.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => err.exit(),
            _ => Err(CliError::UsageError(err.message)),
        })?;

    let log_level = if matches.is_present("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut log_spec_builder = LogSpecBuilder::new();
    log_spec_builder.default(log_level);
    for module in QUIET_MODULES.iter() {
        log_spec_builder.module(module, log::LevelFilter::Warn);
    }

    Logger::with(log_spec_builder.build())
        .format(log_format)
        .start()?;

    let config = MetadataConfig::from_args(&matches)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    metadata::do_get_metadata(
        &config,
        &GatewayMetadataQuery,
        &mut ProcessEnvironment,
        &mut out,
    )
}

fn main() {
    if let Err(e) = run() {
        match e {
            // the logger is not running yet when arguments are rejected
            CliError::UsageError(_) | CliError::LoggingInitializationError(_) => {
                eprintln!("{}", e)
            }
            _ => error!("{}", e),
        }
        std::process::exit(e.exit_code());
    }
}
