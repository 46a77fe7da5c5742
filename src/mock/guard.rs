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

//! Scope-bound override of one intercepted API.
//!
//! An [`OverrideGuard`] makes exactly one substitution active for
//! exactly its own lifetime. Construction installs a behavior into the
//! cell; dropping the guard restores the genuine implementation on
//! every exit path, including panic unwinding out of a test body.
//!
//! The override slot is single, not a stack: constructing a second
//! guard over the same cell while the first is alive overwrites the
//! active behavior, and whichever guard drops first restores straight
//! to the genuine implementation. Callers must not nest guards on one
//! cell.

use std::sync::Arc;

use super::cell::InterceptionCell;
use super::signature::{always_fail, ApiFn, ApiSpec};

/// Installs a substitute behavior for an API, restoring the genuine
/// implementation when dropped.
pub struct OverrideGuard<S: ApiSpec> {
    cell: Arc<InterceptionCell<S>>,
}

impl<S: ApiSpec> OverrideGuard<S> {
    /// Install the canned failure behavior: every call returns
    /// `S::FAILURE` and, when configured, sets `S::ERROR_CODE` as the
    /// last error.
    ///
    /// # Panics
    ///
    /// Panics if the cell's genuine implementation has not been bound;
    /// cells handed out by a [`MockRegistry`](crate::mock::MockRegistry)
    /// are always bound.
    pub fn failing(cell: &Arc<InterceptionCell<S>>) -> Self {
        let guard = Self::attach(cell);
        guard.set_failing();
        guard
    }

    /// Install a custom behavior matching the API's signature.
    ///
    /// The behavior receives every argument of every call unchanged; no
    /// argument filtering happens on its behalf.
    pub fn with(
        cell: &Arc<InterceptionCell<S>>,
        behavior: impl Fn(S::Args) -> S::Ret + Send + Sync + 'static,
    ) -> Self {
        let guard = Self::attach(cell);
        guard.set(behavior);
        guard
    }

    fn attach(cell: &Arc<InterceptionCell<S>>) -> Self {
        assert!(
            cell.is_bound(),
            "override constructed before `{}` was bound",
            S::NAME
        );
        Self {
            cell: Arc::clone(cell),
        }
    }

    /// Replace the active behavior while the guard stays alive.
    pub fn set(&self, behavior: impl Fn(S::Args) -> S::Ret + Send + Sync + 'static) {
        let behavior: ApiFn<S> = Arc::new(behavior);
        self.cell.install(behavior);
    }

    /// Replace the active behavior with the canned failure.
    pub fn set_failing(&self) {
        self.cell.install(always_fail::<S>());
    }

    /// Remove the override immediately, restoring genuine dispatch while
    /// the guard itself stays alive.
    pub fn clear(&self) {
        self.cell.restore();
    }
}

impl<S: ApiSpec> Drop for OverrideGuard<S> {
    fn drop(&mut self) {
        self.cell.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_api;
    use crate::mock::{last_error, set_last_error, ExportTable};

    define_api! {
        pub GuardProbe in "probe": fn(u32) -> u32,
        convention: System,
        failure: 400,
        error_code: 87,
    }

    fn bound_cell() -> Arc<InterceptionCell<GuardProbe>> {
        let cell = Arc::new(InterceptionCell::<GuardProbe>::new());
        cell.bind(&ExportTable::new("probe").export::<GuardProbe>(|(x,)| x));
        cell
    }

    #[test]
    fn failing_guard_installs_canned_failure() {
        let cell = bound_cell();
        set_last_error(0);

        let guard = OverrideGuard::failing(&cell);
        assert_eq!(cell.invoke((7,)), 400);
        assert_eq!(last_error(), 87);

        drop(guard);
        assert_eq!(cell.invoke((7,)), 7);
    }

    #[test]
    fn custom_guard_receives_every_call_unfiltered() {
        let cell = bound_cell();
        let guard = OverrideGuard::with(&cell, |(x,)| x + 100);
        assert_eq!(cell.invoke((1,)), 101);
        assert_eq!(cell.invoke((2,)), 102);
        drop(guard);
        assert_eq!(cell.invoke((1,)), 1);
    }

    #[test]
    fn set_and_clear_take_effect_immediately() {
        let cell = bound_cell();
        let guard = OverrideGuard::failing(&cell);

        guard.set(|(x,)| x * 3);
        assert_eq!(cell.invoke((5,)), 15);

        guard.clear();
        assert_eq!(cell.invoke((5,)), 5);

        guard.set_failing();
        assert_eq!(cell.invoke((5,)), 400);

        drop(guard);
        assert_eq!(cell.invoke((5,)), 5);
    }

    #[test]
    fn sequential_guards_restore_independently() {
        let cell = bound_cell();
        {
            let _g = OverrideGuard::with(&cell, |_| 1);
            assert_eq!(cell.invoke((9,)), 1);
        }
        assert_eq!(cell.invoke((9,)), 9);
        {
            let _g = OverrideGuard::with(&cell, |_| 2);
            assert_eq!(cell.invoke((9,)), 2);
        }
        assert_eq!(cell.invoke((9,)), 9);
    }

    #[test]
    fn nested_guards_are_single_slot() {
        // Documented hazard, not a supported pattern: the inner guard
        // overwrites the outer one, and its drop restores the genuine
        // implementation rather than the outer behavior.
        let cell = bound_cell();
        let outer = OverrideGuard::with(&cell, |_| 1);
        {
            let _inner = OverrideGuard::with(&cell, |_| 2);
            assert_eq!(cell.invoke((9,)), 2);
        }
        assert_eq!(cell.invoke((9,)), 9);
        drop(outer);
        assert_eq!(cell.invoke((9,)), 9);
    }

    #[test]
    fn guard_restores_on_panic_unwind() {
        let cell = bound_cell();
        let cell2 = Arc::clone(&cell);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _g = OverrideGuard::with(&cell2, |_| 0);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(cell.invoke((3,)), 3);
    }

    #[test]
    #[should_panic(expected = "override constructed before `GuardProbe` was bound")]
    fn guard_requires_a_bound_cell() {
        let cell = Arc::new(InterceptionCell::<GuardProbe>::new());
        let _ = OverrideGuard::failing(&cell);
    }
}
