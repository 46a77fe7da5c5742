// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
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

//! SvcFault Service Installer
//!
//! This binary provides commands for registering, starting, stopping,
//! and removing the SvcFault Windows service.
//!
//! # Usage
//!
//! ```text
//! svcfault-install register - Register the service and start it
//! svcfault-install start    - Start the service
//! svcfault-install stop     - Stop the service
//! svcfault-install delete   - Remove the service
//! svcfault-install status   - Query service status
//! ```
//!
//! # Administrator Privileges
//!
//! Most operations require administrator privileges. Run from an
//! elevated command prompt or PowerShell session.

use std::env;
use std::process::ExitCode;

#[cfg(windows)]
use svcfault::{scm::Scm, ApiSurface, Result};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        return ExitCode::FAILURE;
    }

    let command = args[1].to_lowercase();

    #[cfg(windows)]
    {
        let result = match command.as_str() {
            "register" | "install" => cmd_register(),
            "start" => cmd_start(),
            "stop" => cmd_stop(),
            "delete" | "uninstall" => cmd_delete(),
            "status" => cmd_status(),
            "help" | "--help" | "-h" => {
                print_usage(&args[0]);
                Ok(())
            }
            _ => {
                eprintln!("Unknown command: {}", command);
                print_usage(&args[0]);
                return ExitCode::FAILURE;
            }
        };

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }

    #[cfg(not(windows))]
    {
        let _ = command;
        eprintln!("This tool manages a Windows service and requires Windows.");
        ExitCode::FAILURE
    }
}

fn print_usage(program: &str) {
    println!("SvcFault Service Installer");
    println!();
    println!("Usage: {} <command>", program);
    println!();
    println!("Commands:");
    println!("  register    Register the service and start it");
    println!("  start       Start the service");
    println!("  stop        Stop the service");
    println!("  delete      Remove the service");
    println!("  status      Query service status");
    println!("  help        Show this help message");
}

#[cfg(windows)]
fn cmd_register() -> Result<()> {
    let mut scm = Scm::new(std::sync::Arc::new(ApiSurface::system()));
    scm.initialize()?;
    scm.detach();
    println!("Service registered and started.");
    Ok(())
}

#[cfg(windows)]
fn cmd_start() -> Result<()> {
    let mut scm = Scm::new(std::sync::Arc::new(ApiSurface::system()));
    scm.open_existing()?;
    scm.start_service()?;
    scm.detach();
    println!("Service started.");
    Ok(())
}

#[cfg(windows)]
fn cmd_stop() -> Result<()> {
    let mut scm = Scm::new(std::sync::Arc::new(ApiSurface::system()));
    scm.open_existing()?;
    scm.stop_service()?;
    println!("Service stopped.");
    Ok(())
}

#[cfg(windows)]
fn cmd_delete() -> Result<()> {
    let mut scm = Scm::new(std::sync::Arc::new(ApiSurface::system()));
    scm.open_existing()?;
    scm.delete_service()?;
    println!("Service deleted.");
    Ok(())
}

#[cfg(windows)]
fn cmd_status() -> Result<()> {
    use svcfault::api::codes::{
        SERVICE_RUNNING, SERVICE_START_PENDING, SERVICE_STOPPED, SERVICE_STOP_PENDING,
    };

    let mut scm = Scm::new(std::sync::Arc::new(ApiSurface::system()));
    scm.open_existing()?;
    let state = scm.query_service_state()?;
    let name = match state {
        SERVICE_STOPPED => "stopped",
        SERVICE_START_PENDING => "start pending",
        SERVICE_STOP_PENDING => "stop pending",
        SERVICE_RUNNING => "running",
        _ => "unknown",
    };
    println!("Service state: {} ({})", name, state);
    Ok(())
}
