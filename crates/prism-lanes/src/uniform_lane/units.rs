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

use prism_core::renderer::RenderError;

/// Hands out consecutive texture units for one draw.
#[derive(Debug, Clone)]
pub struct TextureUnits {
    next: u32,
    max: u32,
    warned: bool,
}

impl TextureUnits {
    /// An allocator for a device with `max` units.
    pub fn new(max: u32) -> Self {
        Self {
            next: 0,
            max,
            warned: false,
        }
    }

    /// Starts a new draw.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// The next free unit, or `None` once the device maximum is reached. The
    /// first overflow is logged.
    pub fn allocate(&mut self) -> Option<u32> {
        if self.next >= self.max {
            if !self.warned {
                let error = RenderError::UnsupportedCapability(format!(
                    "more than {} texture units in one draw; extra textures are skipped",
                    self.max
                ));
                log::warn!("{error}");
                self.warned = true;
            }
            return None;
        }
        let unit = self.next;
        self.next += 1;
        Some(unit)
    }

    /// Units handed out since the last [`reset`](Self::reset).
    pub fn used(&self) -> u32 {
        self.next
    }
}
