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

//! Call-site facade over the interception layer.
//!
//! Collaborators hold an `Arc<ApiSurface>` and call plain methods; each
//! method routes through the interception cell for its API, so a test
//! can redirect any call with an [`OverrideGuard`](crate::mock::OverrideGuard)
//! over the surface's registry while production call sites stay unchanged.

use crate::mock::MockRegistry;

use super::codes::{Bool, HKey, Lstatus, RawHandle, ScHandle, StatusHandle};
use super::svc::{ControlHandler, ServiceStatus};
use super::{event, reg, svc, sync};

pub struct ApiSurface {
    cells: MockRegistry,
}

impl ApiSurface {
    /// Build a surface over the given registry. The registry must carry
    /// the `advapi32` and `kernel32` modules; a missing module or export
    /// surfaces as a panic on first use of the affected call.
    pub fn new(cells: MockRegistry) -> Self {
        Self { cells }
    }

    /// Surface backed by an in-memory OS simulation, plus the handle
    /// tests use to seed and inspect it.
    pub fn simulated() -> (Self, super::sim::SimOs) {
        let sim = super::sim::SimOs::new();
        let surface = Self::new(MockRegistry::new(sim.export_tables()));
        (surface, sim)
    }

    /// Surface backed by the live Win32 exports.
    #[cfg(windows)]
    pub fn system() -> Self {
        Self::new(MockRegistry::new(super::system::export_tables()))
    }

    /// The interception registry behind this surface, for installing
    /// override guards.
    pub fn cells(&self) -> &MockRegistry {
        &self.cells
    }

    // ----- registry ---------------------------------------------------

    pub fn reg_open_key(&self, root: HKey, path: &str) -> (Lstatus, HKey) {
        self.cells
            .cell::<reg::RegOpenKeyW>()
            .invoke((root, path.to_owned()))
    }

    pub fn reg_create_key(&self, root: HKey, path: &str) -> (Lstatus, HKey) {
        self.cells
            .cell::<reg::RegCreateKeyW>()
            .invoke((root, path.to_owned()))
    }

    pub fn reg_set_value(&self, key: HKey, name: &str, kind: u32, data: Vec<u8>) -> Lstatus {
        self.cells
            .cell::<reg::RegSetValueExW>()
            .invoke((key, name.to_owned(), kind, data))
    }

    pub fn reg_close_key(&self, key: HKey) -> Lstatus {
        self.cells.cell::<reg::RegCloseKey>().invoke((key,))
    }

    // ----- service control manager ------------------------------------

    pub fn open_sc_manager(
        &self,
        machine: Option<&str>,
        database: Option<&str>,
        access: u32,
    ) -> ScHandle {
        self.cells.cell::<svc::OpenSCManagerW>().invoke((
            machine.map(str::to_owned),
            database.map(str::to_owned),
            access,
        ))
    }

    pub fn open_service(&self, manager: ScHandle, name: &str, access: u32) -> ScHandle {
        self.cells
            .cell::<svc::OpenServiceW>()
            .invoke((manager, name.to_owned(), access))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_service(
        &self,
        manager: ScHandle,
        name: &str,
        display_name: &str,
        access: u32,
        service_type: u32,
        start_type: u32,
        error_control: u32,
        binary_path: &str,
    ) -> ScHandle {
        self.cells.cell::<svc::CreateServiceW>().invoke((
            manager,
            name.to_owned(),
            display_name.to_owned(),
            access,
            service_type,
            start_type,
            error_control,
            binary_path.to_owned(),
        ))
    }

    pub fn delete_service(&self, service: ScHandle) -> Bool {
        self.cells.cell::<svc::DeleteService>().invoke((service,))
    }

    pub fn start_service(&self, service: ScHandle, args: Vec<String>) -> Bool {
        self.cells
            .cell::<svc::StartServiceW>()
            .invoke((service, args))
    }

    pub fn control_service(&self, service: ScHandle, control: u32) -> (Bool, ServiceStatus) {
        self.cells
            .cell::<svc::ControlService>()
            .invoke((service, control))
    }

    pub fn query_service_status(&self, service: ScHandle) -> (Bool, ServiceStatus) {
        self.cells
            .cell::<svc::QueryServiceStatus>()
            .invoke((service,))
    }

    pub fn close_service_handle(&self, handle: ScHandle) -> Bool {
        self.cells
            .cell::<svc::CloseServiceHandle>()
            .invoke((handle,))
    }

    pub fn register_service_ctrl_handler(
        &self,
        name: &str,
        handler: ControlHandler,
    ) -> StatusHandle {
        self.cells
            .cell::<svc::RegisterServiceCtrlHandlerW>()
            .invoke((name.to_owned(), handler))
    }

    pub fn set_service_status(&self, handle: StatusHandle, status: ServiceStatus) -> Bool {
        self.cells
            .cell::<svc::SetServiceStatus>()
            .invoke((handle, status))
    }

    // ----- event log --------------------------------------------------

    pub fn register_event_source(&self, machine: Option<&str>, source: &str) -> RawHandle {
        self.cells
            .cell::<event::RegisterEventSourceW>()
            .invoke((machine.map(str::to_owned), source.to_owned()))
    }

    pub fn report_event(
        &self,
        source: RawHandle,
        record_type: u16,
        category: u16,
        event_id: u32,
        strings: Vec<String>,
    ) -> Bool {
        self.cells
            .cell::<event::ReportEventW>()
            .invoke((source, record_type, category, event_id, strings))
    }

    pub fn deregister_event_source(&self, source: RawHandle) -> Bool {
        self.cells
            .cell::<event::DeregisterEventSource>()
            .invoke((source,))
    }

    // ----- synchronization --------------------------------------------

    pub fn create_event(&self, manual_reset: bool, initially_signaled: bool) -> RawHandle {
        self.cells
            .cell::<sync::CreateEventW>()
            .invoke((manual_reset, initially_signaled))
    }

    pub fn set_event(&self, event: RawHandle) -> Bool {
        self.cells.cell::<sync::SetEvent>().invoke((event,))
    }

    pub fn wait_for_single_object(&self, handle: RawHandle, millis: u32) -> u32 {
        self.cells
            .cell::<sync::WaitForSingleObject>()
            .invoke((handle, millis))
    }

    pub fn close_handle(&self, handle: RawHandle) -> Bool {
        self.cells.cell::<sync::CloseHandle>().invoke((handle,))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::codes::*;
    use crate::mock::{last_error, OverrideGuard};

    #[test]
    fn surface_routes_through_the_simulation() {
        let (surface, sim) = ApiSurface::simulated();

        let (status, key) = surface.reg_create_key(HKEY_LOCAL_MACHINE, "Software\\Routed");
        assert_eq!(status, NO_ERROR);
        assert_eq!(
            surface.reg_set_value(key, "Name", REG_SZ, vec![0x42, 0x00]),
            NO_ERROR
        );
        assert_eq!(surface.reg_close_key(key), NO_ERROR);

        assert_eq!(
            sim.string_value("Software\\Routed", "Name").as_deref(),
            Some("B")
        );
    }

    #[test]
    fn overrides_redirect_surface_calls() {
        let (surface, sim) = ApiSurface::simulated();
        sim.seed_key("Software\\Shadowed");

        {
            let _guard = OverrideGuard::<crate::api::reg::RegOpenKeyW>::failing(
                &surface.cells().cell::<crate::api::reg::RegOpenKeyW>(),
            );
            let (status, key) = surface.reg_open_key(HKEY_LOCAL_MACHINE, "Software\\Shadowed");
            assert_eq!(status, ERROR_REGISTRY_CORRUPT);
            assert_eq!(key, 0);
        }

        // Restored: the genuine path sees the seeded key again.
        let (status, _) = surface.reg_open_key(HKEY_LOCAL_MACHINE, "Software\\Shadowed");
        assert_eq!(status, NO_ERROR);
    }

    #[test]
    fn failed_service_open_sets_last_error() {
        let (surface, _sim) = ApiSurface::simulated();

        let manager = surface.open_sc_manager(None, None, SC_MANAGER_CONNECT);
        let service = surface.open_service(manager, "NoSuchService", SERVICE_QUERY_STATUS);
        assert_eq!(service, 0);
        assert_eq!(last_error(), ERROR_SERVICE_DOES_NOT_EXIST);
    }
}
