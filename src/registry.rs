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

//! Registry key wrapper used by the service installer.
//!
//! Keys are opened or created under `HKEY_LOCAL_MACHINE` and closed on
//! drop. All calls go through the injected [`ApiSurface`], so tests can
//! fail any registry operation with an override guard.

use std::sync::Arc;

use tracing::warn;

use crate::api::codes::{HKey, HKEY_LOCAL_MACHINE, NO_ERROR};
use crate::api::ApiSurface;
use crate::error::{Result, SvcError};

/// An open registry key under `HKEY_LOCAL_MACHINE`.
pub struct RegistryKey {
    api: Arc<ApiSurface>,
    key: HKey,
    path: String,
}

impl std::fmt::Debug for RegistryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryKey")
            .field("key", &self.key)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RegistryKey {
    /// Open an existing key.
    pub fn open(api: Arc<ApiSurface>, path: &str) -> Result<Self> {
        let (status, key) = api.reg_open_key(HKEY_LOCAL_MACHINE, path);
        if status != NO_ERROR {
            return Err(SvcError::registry(path, status));
        }
        Ok(Self {
            api,
            key,
            path: path.to_owned(),
        })
    }

    /// Create a key, opening it if it already exists.
    pub fn create(api: Arc<ApiSurface>, path: &str) -> Result<Self> {
        let (status, key) = api.reg_create_key(HKEY_LOCAL_MACHINE, path);
        if status != NO_ERROR {
            return Err(SvcError::registry(path, status));
        }
        Ok(Self {
            api,
            key,
            path: path.to_owned(),
        })
    }

    /// Set a string value on the key.
    ///
    /// The value is stored as UTF-16LE without a terminator; `kind`
    /// selects between `REG_SZ`, `REG_EXPAND_SZ`, and `REG_MULTI_SZ`.
    pub fn add_string_value(&self, name: &str, value: &str, kind: u32) -> Result<()> {
        let data: Vec<u8> = value
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        let status = self.api.reg_set_value(self.key, name, kind, data);
        if status != NO_ERROR {
            return Err(SvcError::registry(&self.path, status));
        }
        Ok(())
    }

    /// Key path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for RegistryKey {
    fn drop(&mut self) {
        let status = self.api.reg_close_key(self.key);
        if status != NO_ERROR {
            warn!(path = %self.path, status, "failed to close registry key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::codes::*;
    use crate::api::reg;
    use crate::mock::OverrideGuard;

    #[test]
    fn create_key_and_store_value() {
        let (api, sim) = ApiSurface::simulated();
        let api = Arc::new(api);

        let key = RegistryKey::create(api.clone(), "Software\\Fault\\Params").unwrap();
        key.add_string_value("ServiceMain", "ServiceMain", REG_SZ)
            .unwrap();

        assert_eq!(
            sim.string_value("Software\\Fault\\Params", "ServiceMain")
                .as_deref(),
            Some("ServiceMain")
        );
        drop(key);
        assert_eq!(sim.live_handles(), 0);
    }

    #[test]
    fn open_missing_key_reports_status() {
        let (api, _sim) = ApiSurface::simulated();
        let err = RegistryKey::open(Arc::new(api), "Software\\Nowhere").unwrap_err();
        assert_eq!(err, SvcError::registry("Software\\Nowhere", ERROR_FILE_NOT_FOUND));
    }

    #[test]
    fn injected_create_failure_surfaces_the_status() {
        let (api, _sim) = ApiSurface::simulated();
        let api = Arc::new(api);

        let cell = api.cells().cell::<reg::RegCreateKeyW>();
        let _guard = OverrideGuard::<reg::RegCreateKeyW>::failing(&cell);

        let err = RegistryKey::create(api, "Software\\Fault").unwrap_err();
        assert_eq!(err.os_code(), Some(ERROR_REGISTRY_CORRUPT));
    }
}
