// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-level properties and their dirty bits.

use bitflags::bitflags;
use kurbo::Size;
use smol_str::SmolStr;

use crate::css::Color;
use crate::transform::Transform3d;

bitflags! {
    /// Scene-level concerns changed since the last sync.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SceneDirty: u8 {
        /// Background fill.
        const FILL = 1 << 0;
        /// Root node or scene size.
        const ROOT = 1 << 1;
        /// Camera.
        const CAMERA = 1 << 2;
        /// Cursor.
        const CURSOR = 1 << 3;
        /// Light list.
        const LIGHTS = 1 << 4;
    }
}

/// A viewing transform applied to the whole scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Transform from scene space to view space.
    pub view: Transform3d,
    /// Vertical field of view in degrees. `None` is a parallel projection.
    pub field_of_view: Option<f64>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Transform3d::IDENTITY,
            field_of_view: None,
        }
    }
}

/// A point light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Light color.
    pub color: Color,
    /// Position in scene space.
    pub position: [f64; 3],
}

/// Properties of the scene itself rather than any node.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneProps {
    /// Background fill.
    pub fill: Color,
    /// Active camera.
    pub camera: Camera,
    /// Cursor name, or `None` for the platform default.
    pub cursor: Option<SmolStr>,
    /// Lights, in insertion order.
    pub lights: Vec<Light>,
    /// Size of the surface the scene is shown on.
    pub size: Size,
}

impl Default for SceneProps {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            camera: Camera::default(),
            cursor: None,
            lights: Vec::new(),
            size: Size::ZERO,
        }
    }
}

/// What a presenter receives when scene-level properties changed.
#[derive(Clone, Copy, Debug)]
pub struct SceneUpdate<'a> {
    /// Which concerns changed.
    pub dirty: SceneDirty,
    /// Current values.
    pub props: &'a SceneProps,
    /// Slot index of the root node, if any.
    pub root: Option<u32>,
}
