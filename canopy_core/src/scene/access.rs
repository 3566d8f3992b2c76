// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped permission to drive a scene off its application thread.

use core::ops::{Deref, DerefMut};

use super::Scene;
use crate::css::{StyleManager, StyleSource};

/// Grants thread-unchecked access to a [`Scene`] for as long as it lives.
///
/// Created by [`Scene::allow_access`]. While a guard exists, entry points
/// skip the thread check; dropping it restores the check.
pub struct AccessGuard<'a, S: StyleSource = StyleManager> {
    scene: &'a mut Scene<S>,
}

impl<S: StyleSource> core::fmt::Debug for AccessGuard<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("depth", &self.scene.access_depth)
            .finish_non_exhaustive()
    }
}

impl<S: StyleSource> Scene<S> {
    /// Opens an access scope.
    ///
    /// Use this when another thread legitimately drives the scene, for
    /// example a test harness or a handoff the application has already
    /// serialized.
    pub fn allow_access(&mut self) -> AccessGuard<'_, S> {
        self.access_depth += 1;
        AccessGuard { scene: self }
    }
}

impl<S: StyleSource> Deref for AccessGuard<'_, S> {
    type Target = Scene<S>;

    fn deref(&self) -> &Scene<S> {
        self.scene
    }
}

impl<S: StyleSource> DerefMut for AccessGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Scene<S> {
        self.scene
    }
}

impl<S: StyleSource> Drop for AccessGuard<'_, S> {
    fn drop(&mut self) {
        self.scene.access_depth -= 1;
    }
}
