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

//! Module export tables.
//!
//! An [`ExportTable`] stands in for a loaded module: a named table of
//! exported functions, resolved by exact export name. Production code
//! loads tables whose exports forward to the genuine OS calls; tests
//! may load tables of fake "genuine" implementations instead. Either
//! way, binding an [`InterceptionCell`](crate::mock::InterceptionCell)
//! against a table is the only way a cell acquires its real
//! implementation.
//!
//! Tables live for the lifetime of the registry that loaded them and
//! are never explicitly released.

use std::any::Any;
use std::collections::HashMap;

use super::signature::{ApiFn, ApiSpec};

/// A named table of module exports.
pub struct ExportTable {
    name: &'static str,
    exports: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ExportTable {
    /// Create an empty table for the module `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            exports: HashMap::new(),
        }
    }

    /// Module name this table stands in for.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add an export for the API `S` under its exact export name.
    ///
    /// A repeated export for the same name replaces the previous one;
    /// the last insertion wins, matching how a module carries a single
    /// export per name.
    pub fn export<S: ApiSpec>(
        mut self,
        f: impl Fn(S::Args) -> S::Ret + Send + Sync + 'static,
    ) -> Self {
        let f: ApiFn<S> = std::sync::Arc::new(f);
        self.exports.insert(S::NAME, Box::new(f));
        self
    }

    /// Resolve the export for `S` by exact name.
    ///
    /// Returns `None` when the name is absent or was exported with a
    /// different signature; callers treat both as an unresolved export.
    pub fn resolve<S: ApiSpec>(&self) -> Option<ApiFn<S>> {
        self.exports
            .get(S::NAME)?
            .downcast_ref::<ApiFn<S>>()
            .cloned()
    }

    /// Whether the table carries an export under `name` at all.
    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }
}

impl std::fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportTable")
            .field("name", &self.name)
            .field("exports", &self.exports.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_api;

    define_api! {
        pub AddTwo in "probe": fn(u32) -> u32,
        convention: System,
        failure: 0,
        error_code: 0,
    }

    #[test]
    fn resolves_exports_by_exact_name() {
        let table = ExportTable::new("probe").export::<AddTwo>(|(x,)| x + 2);
        let f = table.resolve::<AddTwo>().expect("export present");
        assert_eq!(f((40,)), 42);
        assert!(table.contains("AddTwo"));
        assert!(!table.contains("addtwo"));
    }

    #[test]
    fn missing_export_resolves_to_none() {
        let table = ExportTable::new("probe");
        assert!(table.resolve::<AddTwo>().is_none());
    }

    #[test]
    fn repeated_export_replaces_previous() {
        let table = ExportTable::new("probe")
            .export::<AddTwo>(|(x,)| x)
            .export::<AddTwo>(|(x,)| x + 2);
        let f = table.resolve::<AddTwo>().unwrap();
        assert_eq!(f((1,)), 3);
    }
}
