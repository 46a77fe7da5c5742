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

//! Service Control Manager client.
//!
//! [`Scm`] registers, starts, stops, and deletes the hosted service.
//! Registration writes the svchost plumbing: the group value under the
//! svchost key and a `Parameters` key pointing at the service module,
//! so `svchost.exe -k <group>` can load it. A service started through
//! this handle is stopped again on drop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::api::codes::*;
use crate::api::{ApiSurface, ServiceStatus};
use crate::error::{Result, SvcError};
use crate::registry::RegistryKey;
use crate::service::{SERVICE_DISPLAY_NAME, SERVICE_MODULE, SERVICE_NAME};

/// Key whose values name the service groups svchost.exe hosts.
const SVCHOST_KEY: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Svchost";

/// Access needed to create and manage the service.
const MANAGER_ACCESS: u32 =
    SC_MANAGER_CREATE_SERVICE | SC_MANAGER_CONNECT | STANDARD_RIGHTS_WRITE | STANDARD_RIGHTS_READ;
const SERVICE_ACCESS: u32 =
    SERVICE_CHANGE_CONFIG | SERVICE_QUERY_STATUS | SERVICE_START | SERVICE_STOP | DELETE;

/// Attempts made while polling for a state transition.
const POLL_ATTEMPTS: u32 = 12;

/// `Parameters` key for a service, relative to `HKEY_LOCAL_MACHINE`.
fn parameters_key(service: &str) -> String {
    format!("SYSTEM\\CurrentControlSet\\Services\\{service}\\Parameters")
}

/// Handle on the Service Control Manager and one service.
pub struct Scm {
    api: Arc<ApiSurface>,
    manager: Option<ScHandle>,
    service: Option<ScHandle>,
    poll_interval: Duration,
    /// Set once this handle has started the service; drop stops it
    /// again unless [`Scm::detach`] is called.
    stop_on_drop: bool,
}

impl Scm {
    pub fn new(api: Arc<ApiSurface>) -> Self {
        Self::with_poll_interval(api, Duration::from_secs(5))
    }

    /// Same as [`Scm::new`] with the interval between status polls
    /// overridden, so tests do not sleep for real.
    pub fn with_poll_interval(api: Arc<ApiSurface>, poll_interval: Duration) -> Self {
        Self {
            api,
            manager: None,
            service: None,
            poll_interval,
            stop_on_drop: false,
        }
    }

    /// Connect to the SCM, then open the service and start it,
    /// registering it first when it does not exist yet.
    pub fn initialize(&mut self) -> Result<()> {
        let manager = self
            .api
            .open_sc_manager(None, None, MANAGER_ACCESS);
        if manager == 0 {
            let code = crate::mock::last_error();
            if code == ERROR_ACCESS_DENIED {
                return Err(SvcError::access_denied("connecting to the SCM"));
            }
            return Err(SvcError::os("OpenSCManagerW", code));
        }
        self.manager = Some(manager);

        let service = self.api.open_service(manager, SERVICE_NAME, SERVICE_ACCESS);
        if service == 0 {
            let code = crate::mock::last_error();
            return match code {
                ERROR_SERVICE_DOES_NOT_EXIST => self.register_service(),
                _ => Err(SvcError::os("OpenServiceW", code)),
            };
        }
        self.service = Some(service);

        self.start_service()
    }

    /// Create the service and write its svchost plumbing, then start it.
    pub fn register_service(&mut self) -> Result<()> {
        let manager = self.manager.ok_or(SvcError::NotConnected)?;

        info!(service = SERVICE_NAME, "registering service");

        let binary_path = format!("C:\\Windows\\System32\\svchost.exe -k {SERVICE_NAME}");
        let created = self.api.create_service(
            manager,
            SERVICE_NAME,
            SERVICE_DISPLAY_NAME,
            SERVICE_ACCESS,
            SERVICE_WIN32_OWN_PROCESS,
            SERVICE_DEMAND_START,
            SERVICE_ERROR_NORMAL,
            &binary_path,
        );
        if created == 0 {
            return Err(SvcError::os("CreateServiceW", crate::mock::last_error()));
        }
        self.api.close_service_handle(created);

        // svchost group: the value name is the group, the data the
        // service name.
        let svchost = RegistryKey::open(self.api.clone(), SVCHOST_KEY)?;
        svchost.add_string_value(SERVICE_NAME, SERVICE_NAME, REG_MULTI_SZ)?;

        // Parameters key tells svchost which module to load and which
        // entrypoint to call.
        let parameters = RegistryKey::create(self.api.clone(), &parameters_key(SERVICE_NAME))?;
        parameters.add_string_value("ServiceDll", &self.service_module_path()?, REG_EXPAND_SZ)?;
        parameters.add_string_value("ServiceMain", "ServiceMain", REG_SZ)?;

        let service = self
            .api
            .open_service(manager, SERVICE_NAME, SERVICE_ACCESS);
        if service == 0 {
            return Err(SvcError::os("OpenServiceW", crate::mock::last_error()));
        }
        self.service = Some(service);

        self.start_service()
    }

    /// Start the service and poll until it is running.
    pub fn start_service(&mut self) -> Result<()> {
        let service = self.service.ok_or(SvcError::NotConnected)?;

        info!(service = SERVICE_NAME, "starting service");

        if self.api.start_service(service, Vec::new()) == FALSE {
            let code = crate::mock::last_error();
            if code == ERROR_SERVICE_ALREADY_RUNNING {
                return Ok(());
            }
            return Err(SvcError::os("StartServiceW", code));
        }

        for _ in 0..POLL_ATTEMPTS {
            match self.query_status(service)?.current_state {
                SERVICE_RUNNING => {
                    info!(service = SERVICE_NAME, "service started");
                    self.stop_on_drop = true;
                    return Ok(());
                }
                SERVICE_START_PENDING => std::thread::sleep(self.poll_interval),
                state => {
                    error!(service = SERVICE_NAME, state, "service failed to start");
                    return Err(SvcError::unexpected_state(SERVICE_NAME, state));
                }
            }
        }

        Err(SvcError::start_timeout(
            SERVICE_NAME,
            (self.poll_interval * POLL_ATTEMPTS).as_secs(),
        ))
    }

    /// Stop the service and poll until it has stopped.
    pub fn stop_service(&mut self) -> Result<()> {
        let service = self.service.ok_or(SvcError::NotConnected)?;

        info!(service = SERVICE_NAME, "stopping service");

        let (ok, mut status) = self.api.control_service(service, SERVICE_CONTROL_STOP);
        if ok == FALSE {
            return Err(SvcError::os("ControlService", crate::mock::last_error()));
        }

        for _ in 0..POLL_ATTEMPTS {
            match status.current_state {
                SERVICE_STOPPED => {
                    info!(service = SERVICE_NAME, "service stopped");
                    self.stop_on_drop = false;
                    return Ok(());
                }
                SERVICE_STOP_PENDING => {
                    std::thread::sleep(self.poll_interval);
                    status = self.query_status(service)?;
                }
                state => {
                    error!(service = SERVICE_NAME, state, "service failed to stop");
                    return Err(SvcError::unexpected_state(SERVICE_NAME, state));
                }
            }
        }

        Err(SvcError::unexpected_state(
            SERVICE_NAME,
            status.current_state,
        ))
    }

    /// Mark the service for deletion.
    pub fn delete_service(&mut self) -> Result<()> {
        let service = self.service.ok_or(SvcError::NotConnected)?;

        info!(service = SERVICE_NAME, "deleting service");

        if self.api.delete_service(service) == FALSE {
            return Err(SvcError::os("DeleteService", crate::mock::last_error()));
        }
        Ok(())
    }

    /// Current state of the service, for the installer's status command.
    pub fn query_service_state(&self) -> Result<u32> {
        let service = self.service.ok_or(SvcError::NotConnected)?;
        Ok(self.query_status(service)?.current_state)
    }

    /// Open the service without starting it. Used by commands that
    /// operate on an already registered service.
    pub fn open_existing(&mut self) -> Result<()> {
        let manager = self
            .api
            .open_sc_manager(None, None, MANAGER_ACCESS);
        if manager == 0 {
            let code = crate::mock::last_error();
            if code == ERROR_ACCESS_DENIED {
                return Err(SvcError::access_denied("connecting to the SCM"));
            }
            return Err(SvcError::os("OpenSCManagerW", code));
        }
        self.manager = Some(manager);

        let service = self.api.open_service(manager, SERVICE_NAME, SERVICE_ACCESS);
        if service == 0 {
            let code = crate::mock::last_error();
            return match code {
                ERROR_SERVICE_DOES_NOT_EXIST => {
                    Err(SvcError::service_not_found(SERVICE_NAME))
                }
                _ => Err(SvcError::os("OpenServiceW", code)),
            };
        }
        self.service = Some(service);
        Ok(())
    }

    /// Leave the service running when this handle drops.
    pub fn detach(&mut self) {
        self.stop_on_drop = false;
    }

    fn query_status(&self, service: ScHandle) -> Result<ServiceStatus> {
        let (ok, status) = self.api.query_service_status(service);
        if ok == FALSE {
            return Err(SvcError::os(
                "QueryServiceStatus",
                crate::mock::last_error(),
            ));
        }
        Ok(status)
    }

    /// Path of the service module, assumed to sit next to this
    /// process image.
    fn service_module_path(&self) -> Result<String> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| std::path::Path::new("."));
        Ok(dir.join(SERVICE_MODULE).to_string_lossy().into_owned())
    }
}

impl Drop for Scm {
    fn drop(&mut self) {
        if self.stop_on_drop && self.service.is_some() {
            if let Err(err) = self.stop_service() {
                warn!(%err, "failed to stop service during cleanup");
            }
        }
        if let Some(service) = self.service.take() {
            self.api.close_service_handle(service);
        }
        if let Some(manager) = self.manager.take() {
            self.api.close_service_handle(manager);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::svc;
    use crate::mock::{last_error, OverrideGuard};

    fn scm() -> (Scm, crate::api::SimOs) {
        let (api, sim) = ApiSurface::simulated();
        (
            Scm::with_poll_interval(Arc::new(api), Duration::from_millis(1)),
            sim,
        )
    }

    #[test]
    fn initialize_registers_and_starts_a_missing_service() {
        let (mut scm, sim) = scm();
        sim.seed_key(SVCHOST_KEY);

        scm.initialize().unwrap();

        assert_eq!(sim.service_state(SERVICE_NAME), Some(SERVICE_RUNNING));
        assert_eq!(
            sim.string_value(SVCHOST_KEY, SERVICE_NAME).as_deref(),
            Some(SERVICE_NAME)
        );
        let parameters = parameters_key(SERVICE_NAME);
        assert_eq!(
            sim.string_value(&parameters, "ServiceMain").as_deref(),
            Some("ServiceMain")
        );
        assert!(sim
            .string_value(&parameters, "ServiceDll")
            .is_some_and(|path| path.ends_with(SERVICE_MODULE)));
    }

    #[test]
    fn initialize_starts_an_existing_service() {
        let (mut scm, sim) = scm();
        sim.seed_service(SERVICE_NAME, SERVICE_STOPPED);

        scm.initialize().unwrap();
        assert_eq!(sim.service_state(SERVICE_NAME), Some(SERVICE_RUNNING));
    }

    #[test]
    fn starting_a_running_service_succeeds() {
        let (mut scm, sim) = scm();
        sim.seed_service(SERVICE_NAME, SERVICE_RUNNING);

        scm.initialize().unwrap();
        assert_eq!(sim.service_state(SERVICE_NAME), Some(SERVICE_RUNNING));
    }

    #[test]
    fn stop_on_drop_leaves_the_service_stopped() {
        let (mut scm, sim) = scm();
        sim.seed_service(SERVICE_NAME, SERVICE_STOPPED);
        scm.initialize().unwrap();

        drop(scm);
        assert_eq!(sim.service_state(SERVICE_NAME), Some(SERVICE_STOPPED));
    }

    #[test]
    fn denied_manager_access_maps_to_access_denied() {
        let (api, _sim) = ApiSurface::simulated();
        let api = Arc::new(api);
        let mut scm = Scm::with_poll_interval(api.clone(), Duration::from_millis(1));

        let cell = api.cells().cell::<svc::OpenSCManagerW>();
        let _guard = OverrideGuard::<svc::OpenSCManagerW>::with(&cell, |_args| {
            crate::mock::set_last_error(ERROR_ACCESS_DENIED);
            0
        });

        assert_eq!(
            scm.initialize().unwrap_err(),
            SvcError::access_denied("connecting to the SCM")
        );
    }

    #[test]
    fn start_failure_carries_the_os_code() {
        let (mut scm, sim) = scm();
        sim.seed_service(SERVICE_NAME, SERVICE_STOPPED);

        let cell = {
            let api = &scm.api;
            api.cells().cell::<svc::StartServiceW>()
        };
        let _guard = OverrideGuard::<svc::StartServiceW>::failing(&cell);

        let err = scm.initialize().unwrap_err();
        assert_eq!(err, SvcError::os("StartServiceW", ERROR_INVALID_HANDLE));
        assert_eq!(last_error(), ERROR_INVALID_HANDLE);
    }

    #[test]
    fn service_stuck_pending_times_out() {
        let (mut scm, sim) = scm();
        sim.seed_service(SERVICE_NAME, SERVICE_STOPPED);
        scm.open_existing().unwrap();

        let cell = scm.api.cells().cell::<svc::QueryServiceStatus>();
        let _guard = OverrideGuard::<svc::QueryServiceStatus>::with(&cell, |_args| {
            (
                TRUE,
                ServiceStatus {
                    current_state: SERVICE_START_PENDING,
                    ..ServiceStatus::ZERO
                },
            )
        });

        assert!(matches!(
            scm.start_service().unwrap_err(),
            SvcError::StartTimeout { .. }
        ));

        // Keep drop from polling against the same stuck override.
        scm.service = None;
    }

    #[test]
    fn open_existing_reports_a_missing_service() {
        let (mut scm, _sim) = scm();
        assert_eq!(
            scm.open_existing().unwrap_err(),
            SvcError::service_not_found(SERVICE_NAME)
        );
    }
}
