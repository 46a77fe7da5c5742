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

//! System event log writer.

use std::sync::Arc;

use tracing::warn;

use crate::api::codes::{RawHandle, EVENTLOG_ERROR_TYPE, EVENTLOG_INFORMATION_TYPE, FALSE};
use crate::api::ApiSurface;
use crate::error::{Result, SvcError};

/// A registered event source, deregistered on drop.
pub struct EventLog {
    api: Arc<ApiSurface>,
    source: RawHandle,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl EventLog {
    /// Register an event source on the local machine.
    pub fn register(api: Arc<ApiSurface>, source: &str) -> Result<Self> {
        let handle = api.register_event_source(None, source);
        if handle == 0 {
            return Err(SvcError::os(
                "RegisterEventSourceW",
                crate::mock::last_error(),
            ));
        }
        Ok(Self {
            api,
            source: handle,
        })
    }

    /// Write an informational record with one insertion string.
    pub fn log(&self, message: &str) -> Result<()> {
        self.report(EVENTLOG_INFORMATION_TYPE, message)
    }

    /// Write an error record with one insertion string.
    pub fn log_error(&self, message: &str) -> Result<()> {
        self.report(EVENTLOG_ERROR_TYPE, message)
    }

    fn report(&self, record_type: u16, message: &str) -> Result<()> {
        let ok = self
            .api
            .report_event(self.source, record_type, 0, 0, vec![message.to_owned()]);
        if ok == FALSE {
            return Err(SvcError::os("ReportEventW", crate::mock::last_error()));
        }
        Ok(())
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if self.api.deregister_event_source(self.source) == FALSE {
            warn!(
                code = crate::mock::last_error(),
                "failed to deregister event source"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::codes::ERROR_INVALID_HANDLE;
    use crate::api::event;
    use crate::mock::OverrideGuard;
    use crate::service::SERVICE_NAME;

    #[test]
    fn log_writes_a_record_under_the_source() {
        let (api, sim) = ApiSurface::simulated();
        let log = EventLog::register(Arc::new(api), SERVICE_NAME).unwrap();

        log.log("service initialized").unwrap();

        let events = sim.logged_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, SERVICE_NAME);
        assert_eq!(events[0].record_type, EVENTLOG_INFORMATION_TYPE);
        assert_eq!(events[0].strings, vec!["service initialized".to_owned()]);

        drop(log);
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn injected_register_failure_surfaces_the_code() {
        let (api, _sim) = ApiSurface::simulated();
        let api = Arc::new(api);

        let cell = api.cells().cell::<event::RegisterEventSourceW>();
        let _guard = OverrideGuard::<event::RegisterEventSourceW>::failing(&cell);

        let err = EventLog::register(api, SERVICE_NAME).unwrap_err();
        assert_eq!(
            err,
            SvcError::os("RegisterEventSourceW", ERROR_INVALID_HANDLE)
        );
    }
}
