// Copyright 2025 eraflo
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

//! Per-frame and cumulative rendering counters.

use super::api::PrimitiveMode;

/// Counters exposed by the renderer after each frame.
///
/// Frame counters (`calls`, `triangles`, `lines`, `points`, `skipped_items`)
/// are reset at the start of every frame. Resource counters track live
/// cache entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Number of frames rendered.
    pub frame: u64,
    /// Draw calls issued this frame.
    pub calls: u32,
    /// Triangles submitted this frame.
    pub triangles: u32,
    /// Line segments submitted this frame.
    pub lines: u32,
    /// Points submitted this frame.
    pub points: u32,
    /// Render items skipped this frame because of a local failure.
    pub skipped_items: u32,
    /// Live compiled programs.
    pub programs: u32,
    /// Geometries with live GPU buffers.
    pub geometries: u32,
    /// Live GPU textures.
    pub textures: u32,
}

impl RenderStats {
    /// Starts a new frame, clearing the per-frame counters.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.calls = 0;
        self.triangles = 0;
        self.lines = 0;
        self.points = 0;
        self.skipped_items = 0;
    }

    /// Records one draw of `count` vertices (or indices).
    pub fn record_draw(&mut self, mode: PrimitiveMode, count: u32) {
        self.calls += 1;
        let primitives = mode.primitive_count(count);
        match mode {
            PrimitiveMode::Triangles | PrimitiveMode::TriangleStrip => self.triangles += primitives,
            PrimitiveMode::Lines | PrimitiveMode::LineStrip => self.lines += primitives,
            PrimitiveMode::Points => self.points += primitives,
        }
    }
}
