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

use super::list::RenderList;
use ahash::AHashMap;
use prism_core::scene::SceneId;

/// Render lists pooled per scene and recursion depth, so that rendering a
/// scene from inside another scene's frame does not clobber the outer list.
#[derive(Debug, Default)]
pub struct RenderLists {
    lists: AHashMap<(SceneId, usize), RenderList>,
}

impl RenderLists {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// The list for `scene` at `depth`, created on first use.
    pub fn get(&mut self, scene: SceneId, depth: usize) -> &mut RenderList {
        self.lists.entry((scene, depth)).or_default()
    }

    /// Number of pooled lists.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Frees every list.
    pub fn dispose(&mut self) {
        self.lists.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_are_pooled_per_scene_and_depth() {
        let mut lists = RenderLists::new();
        let (a, b) = (SceneId(1), SceneId(2));
        lists.get(a, 0).init();
        lists.get(a, 0).init();
        lists.get(a, 1).init();
        lists.get(b, 0).init();
        assert_eq!(lists.len(), 3);
        lists.dispose();
        assert!(lists.is_empty());
    }
}
