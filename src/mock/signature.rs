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

//! Compile-time description of an intercepted OS entry point.
//!
//! Every API that can be substituted under test is declared once, via
//! [`define_api!`], as an uninhabited type implementing [`ApiSpec`]. The
//! spec fixes the call signature (argument tuple, return type, calling
//! convention), the export/module names used when binding the genuine
//! implementation, and the canned-failure parameters: the sentinel the
//! API returns on failure and the last-error code the failure sets.
//!
//! The descriptor itself has no runtime state; it is a contract consumed
//! by [`InterceptionCell`](crate::mock::InterceptionCell) and
//! [`OverrideGuard`](crate::mock::OverrideGuard).

use std::cell::Cell;
use std::sync::Arc;

/// Calling convention of an intercepted free function.
///
/// The OS surface mixes conventions; the descriptor records which one a
/// raw export uses so a platform loader can produce the right function
/// type when resolving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConvention {
    /// `extern "system"` (`__stdcall` on 32-bit Windows).
    System,
    /// `extern "C"` (`__cdecl`).
    C,
}

/// Compile-time signature descriptor for one intercepted OS API.
///
/// Implemented by the uninhabited marker types that [`define_api!`]
/// generates; never implemented by hand.
pub trait ApiSpec: 'static {
    /// Ordered argument tuple of the call.
    type Args: 'static;
    /// Return value of the call. Out-parameters of the original OS
    /// signature are folded into tuple returns.
    type Ret: Copy + Send + Sync + 'static;

    /// Exact export name the genuine implementation is resolved under.
    const NAME: &'static str;
    /// Name of the module owning the export.
    const MODULE: &'static str;
    /// Calling convention of the raw export.
    const CONVENTION: CallConvention;
    /// Sentinel returned by the canned failure behavior.
    const FAILURE: Self::Ret;
    /// Last-error code set by the canned failure behavior; `0` leaves
    /// the last-error untouched.
    const ERROR_CODE: u32;
}

/// Callable adapter able to hold any behavior matching an API signature,
/// genuine or test-installed.
pub type ApiFn<S> =
    Arc<dyn Fn(<S as ApiSpec>::Args) -> <S as ApiSpec>::Ret + Send + Sync + 'static>;

/// The canonical "always fail" behavior for an API.
///
/// Ignores all arguments, sets the process-visible last-error when the
/// spec configures one, and returns the fixed failure sentinel. This is
/// what a behaviorless [`OverrideGuard`](crate::mock::OverrideGuard)
/// installs.
pub fn always_fail<S: ApiSpec>() -> ApiFn<S> {
    Arc::new(|_args| {
        if S::ERROR_CODE != 0 {
            set_last_error(S::ERROR_CODE);
        }
        S::FAILURE
    })
}

thread_local! {
    static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
}

/// Read the calling thread's last OS error code.
///
/// Mirrors `GetLastError` semantics: both genuine and substituted
/// implementations publish their failure codes here, so collaborator
/// error handling reads one source regardless of which implementation
/// ran.
pub fn last_error() -> u32 {
    LAST_ERROR.with(Cell::get)
}

/// Set the calling thread's last OS error code (`SetLastError`).
pub fn set_last_error(code: u32) {
    LAST_ERROR.with(|slot| slot.set(code));
}

/// Declares one intercepted OS API: an uninhabited marker type plus its
/// [`ApiSpec`] implementation.
///
/// ```
/// use svcfault::define_api;
///
/// define_api! {
///     /// `GetTickCount` from kernel32.
///     pub GetTickCount in "kernel32": fn() -> u32,
///     convention: System,
///     failure: 0,
///     error_code: 6,
/// }
/// ```
#[macro_export]
macro_rules! define_api {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident in $module:literal: fn($($arg:ty),* $(,)?) -> $ret:ty,
        convention: $conv:ident,
        failure: $failure:expr,
        error_code: $err:expr $(,)?
    ) => {
        $(#[$meta])*
        $vis enum $name {}

        impl $crate::mock::ApiSpec for $name {
            type Args = ($($arg,)*);
            type Ret = $ret;

            const NAME: &'static str = stringify!($name);
            const MODULE: &'static str = $module;
            const CONVENTION: $crate::mock::CallConvention =
                $crate::mock::CallConvention::$conv;
            const FAILURE: Self::Ret = $failure;
            const ERROR_CODE: u32 = $err;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    define_api! {
        /// Test-only API returning a status code.
        pub ProbeApi in "probe": fn(u32, u32) -> u32,
        convention: System,
        failure: 55,
        error_code: 6,
    }

    define_api! {
        /// Test-only API that fails without touching the last-error.
        pub SilentApi in "probe": fn() -> i32,
        convention: C,
        failure: -1,
        error_code: 0,
    }

    #[test]
    fn always_fail_returns_sentinel_and_sets_error() {
        set_last_error(0);
        let f = always_fail::<ProbeApi>();
        assert_eq!(f((1, 2)), 55);
        assert_eq!(last_error(), 6);
    }

    #[test]
    fn always_fail_leaves_error_untouched_when_unconfigured() {
        set_last_error(1234);
        let f = always_fail::<SilentApi>();
        assert_eq!(f(()), -1);
        assert_eq!(last_error(), 1234);
    }

    #[test]
    fn spec_records_signature_metadata() {
        assert_eq!(ProbeApi::NAME, "ProbeApi");
        assert_eq!(ProbeApi::MODULE, "probe");
        assert_eq!(ProbeApi::CONVENTION, CallConvention::System);
        assert_eq!(SilentApi::CONVENTION, CallConvention::C);
    }

    #[test]
    fn last_error_is_per_thread() {
        set_last_error(42);
        std::thread::spawn(|| {
            assert_eq!(last_error(), 0);
            set_last_error(7);
        })
        .join()
        .unwrap();
        assert_eq!(last_error(), 42);
    }
}
