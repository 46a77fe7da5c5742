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

//! Per-API interception state.
//!
//! One [`InterceptionCell`] exists per intercepted API (the
//! [`MockRegistry`](crate::mock::MockRegistry) enforces the one-cell
//! invariant). The cell holds the genuine implementation, bound once
//! from a module export table, and the currently active implementation,
//! which is either that genuine one or a behavior installed by a live
//! [`OverrideGuard`](crate::mock::OverrideGuard). Every call to the API
//! funnels through [`InterceptionCell::invoke`]; callers never learn
//! which implementation ran.

use std::sync::{OnceLock, RwLock};

use super::module::ExportTable;
use super::signature::{set_last_error, ApiFn, ApiSpec};

/// Last-error published when dispatch itself faults (ERROR_OUTOFMEMORY).
/// An internal framework fault must surface as the API's own documented
/// failure, never as an unwind across the interception boundary.
const DISPATCH_FAULT_ERROR: u32 = 14;

/// Process-lifetime interception state for one OS API.
pub struct InterceptionCell<S: ApiSpec> {
    /// Genuine implementation; write-once after the first successful bind.
    real: OnceLock<ApiFn<S>>,
    /// Whatever a call currently dispatches to. `None` only before the
    /// first bind.
    active: RwLock<Option<ApiFn<S>>>,
}

impl<S: ApiSpec> InterceptionCell<S> {
    /// Create an unbound cell.
    pub fn new() -> Self {
        Self {
            real: OnceLock::new(),
            active: RwLock::new(None),
        }
    }

    /// Resolve `S::NAME` in `module` and store it as the genuine
    /// implementation.
    ///
    /// Idempotent: once bound, later binds are no-ops. If no override is
    /// installed yet, the freshly bound implementation becomes active.
    ///
    /// # Panics
    ///
    /// Panics when the export cannot be resolved. A missing export is an
    /// environment or packaging defect, never a recoverable condition in
    /// a test binary.
    pub fn bind(&self, module: &ExportTable) {
        if self.real.get().is_some() {
            return;
        }
        let Some(real) = module.resolve::<S>() else {
            panic!(
                "unresolved export `{}` in module `{}`",
                S::NAME,
                module.name()
            );
        };
        let real = self.real.get_or_init(|| real).clone();
        let mut active = self
            .active
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if active.is_none() {
            *active = Some(real);
        }
    }

    /// Whether the genuine implementation has been bound.
    pub fn is_bound(&self) -> bool {
        self.real.get().is_some()
    }

    /// Forward a call to the active implementation.
    ///
    /// This is the only operation collaborators use; they cannot tell a
    /// substituted behavior from the genuine one. An internal dispatch
    /// fault is converted into the API's documented failure sentinel
    /// plus `ERROR_OUTOFMEMORY` rather than escaping.
    ///
    /// # Panics
    ///
    /// Panics when invoked before the cell is bound; calling an API that
    /// was never resolved is a configuration defect.
    pub fn invoke(&self, args: S::Args) -> S::Ret {
        let behavior = match self.active.read() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                set_last_error(DISPATCH_FAULT_ERROR);
                return S::FAILURE;
            }
        };
        match behavior {
            Some(f) => f(args),
            None => panic!("`{}` invoked before its genuine export was bound", S::NAME),
        }
    }

    /// Install `behavior` as the active implementation.
    ///
    /// Only [`OverrideGuard`](crate::mock::OverrideGuard) calls this; at
    /// most one live guard may be installing into a cell at a time.
    pub(crate) fn install(&self, behavior: ApiFn<S>) {
        let mut active = self
            .active
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *active = Some(behavior);
    }

    /// Restore the genuine implementation as active.
    pub(crate) fn restore(&self) {
        if let Some(real) = self.real.get() {
            let mut active = self
                .active
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *active = Some(real.clone());
        }
    }
}

impl<S: ApiSpec> Default for InterceptionCell<S> {
    fn default() -> Self {
        Self::new()
    }
}
