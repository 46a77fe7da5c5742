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

//! Explicit registry of interception cells.
//!
//! Instead of implicit process-wide statics, all per-API state lives in
//! a [`MockRegistry`]: a keyed map from API identifier to its boxed
//! interception cell, constructed once at suite start and reached by
//! dependency injection at both production call sites (through
//! [`ApiSurface`](crate::api::ApiSurface)) and test override guards.
//! Exactly one cell exists per API per registry; separate registries
//! (one per test, typically) hold fully disjoint state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::cell::InterceptionCell;
use super::module::ExportTable;
use super::signature::ApiSpec;

/// Keyed map from intercepted API to its interception cell, plus the
/// module tables cells bind against.
pub struct MockRegistry {
    modules: HashMap<&'static str, ExportTable>,
    cells: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl MockRegistry {
    /// Create a registry over the given module export tables.
    pub fn new(modules: impl IntoIterator<Item = ExportTable>) -> Self {
        let modules = modules
            .into_iter()
            .map(|table| (table.name(), table))
            .collect();
        Self {
            modules,
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Load an additional module table. A table with the same name
    /// replaces the previous one, but cells already bound keep their
    /// genuine implementations.
    pub fn load_module(&mut self, table: ExportTable) {
        self.modules.insert(table.name(), table);
    }

    /// Look up a loaded module table by name.
    pub fn module(&self, name: &str) -> Option<&ExportTable> {
        self.modules.get(name)
    }

    /// Get the unique cell for `S`, creating and binding it on first
    /// retrieval.
    ///
    /// # Panics
    ///
    /// Panics when `S::MODULE` was never loaded or lacks the `S::NAME`
    /// export; an unresolvable API is a configuration defect surfaced at
    /// first use, never a soft failure.
    pub fn cell<S: ApiSpec>(&self) -> Arc<InterceptionCell<S>> {
        if let Some(cell) = self.lookup::<S>() {
            return cell;
        }

        let module = self.modules.get(S::MODULE).unwrap_or_else(|| {
            panic!("module `{}` not loaded for API `{}`", S::MODULE, S::NAME)
        });

        let mut cells = self
            .cells
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Re-check under the write lock so concurrent first retrievals
        // still end up sharing one cell.
        let entry = cells
            .entry(TypeId::of::<S>())
            .or_insert_with(|| Arc::new(InterceptionCell::<S>::new()) as Arc<dyn Any + Send + Sync>)
            .clone();
        drop(cells);

        let cell = entry
            .downcast::<InterceptionCell<S>>()
            .expect("cell map keyed by spec type");
        cell.bind(module);
        cell
    }

    fn lookup<S: ApiSpec>(&self) -> Option<Arc<InterceptionCell<S>>> {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        let entry = cells.get(&TypeId::of::<S>())?.clone();
        entry.downcast::<InterceptionCell<S>>().ok()
    }
}

impl std::fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MockRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("cells", &cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_api;

    define_api! {
        pub RegProbe in "probe": fn(u32) -> u32,
        convention: System,
        failure: 0,
        error_code: 0,
    }

    define_api! {
        pub Orphan in "missing": fn() -> u32,
        convention: System,
        failure: 0,
        error_code: 0,
    }

    define_api! {
        pub NotExported in "probe": fn() -> u32,
        convention: System,
        failure: 0,
        error_code: 0,
    }

    fn registry() -> MockRegistry {
        MockRegistry::new([ExportTable::new("probe").export::<RegProbe>(|(x,)| x + 1)])
    }

    #[test]
    fn cell_is_created_bound_and_unique() {
        let registry = registry();
        let a = registry.cell::<RegProbe>();
        let b = registry.cell::<RegProbe>();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_bound());
        assert_eq!(a.invoke((1,)), 2);
    }

    #[test]
    fn registries_hold_disjoint_state() {
        let first = registry();
        let second = registry();
        assert!(!Arc::ptr_eq(
            &first.cell::<RegProbe>(),
            &second.cell::<RegProbe>()
        ));
    }

    #[test]
    #[should_panic(expected = "module `missing` not loaded for API `Orphan`")]
    fn unloaded_module_is_fatal() {
        registry().cell::<Orphan>();
    }

    #[test]
    fn modules_can_be_loaded_after_construction() {
        let mut registry = MockRegistry::new([]);
        registry.load_module(ExportTable::new("probe").export::<RegProbe>(|(x,)| x + 1));
        assert_eq!(registry.cell::<RegProbe>().invoke((4,)), 5);
    }

    #[test]
    #[should_panic(expected = "unresolved export `NotExported` in module `probe`")]
    fn missing_export_is_fatal_at_first_retrieval() {
        registry().cell::<NotExported>();
    }
}
