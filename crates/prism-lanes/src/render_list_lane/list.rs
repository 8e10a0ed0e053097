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

use prism_core::scene::{AssetId, Geometry, GeometryGroup, Material, SceneObject};
use std::cmp::Ordering;

/// One draw: an object, one of its materials and optionally a geometry group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// Unique per frame, in push order. The final sort tie-breaker.
    pub id: u32,
    /// The object drawn.
    pub object: AssetId<SceneObject>,
    /// Position of the object in its scene's object list.
    pub object_index: usize,
    /// Geometry of the object.
    pub geometry: AssetId<Geometry>,
    /// Material used for this draw.
    pub material: AssetId<Material>,
    /// Creation rank of the material's program; 0 when not yet known.
    pub program_sort_id: u32,
    /// Coarse ordering bucket; lower draws first.
    pub group_order: i32,
    /// User ordering within the bucket; lower draws first.
    pub render_order: i32,
    /// Distance along the camera's view direction.
    pub depth: f32,
    /// Sub-range drawn, for multi-material geometries.
    pub group: Option<GeometryGroup>,
}

/// Orders two render items.
pub type RenderItemComparator = fn(&RenderItem, &RenderItem) -> Ordering;

/// Default opaque order: group order, render order, program, material,
/// nearest first, then push order.
pub fn painter_sort_stable(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(a.program_sort_id.cmp(&b.program_sort_id))
        .then(a.material.cmp(&b.material))
        .then(a.depth.total_cmp(&b.depth))
        .then(a.id.cmp(&b.id))
}

/// Default transparent order: group order, render order, farthest first,
/// then push order.
pub fn reverse_painter_sort_stable(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(b.depth.total_cmp(&a.depth))
        .then(a.id.cmp(&b.id))
}

/// The draws of one scene at one recursion depth.
///
/// Item storage is reused from frame to frame; [`init`](Self::init) resets
/// the lists without freeing it and [`finish`](Self::finish) drops what the
/// current frame did not overwrite.
#[derive(Debug, Default)]
pub struct RenderList {
    items: Vec<RenderItem>,
    used: usize,
    opaque: Vec<usize>,
    transparent: Vec<usize>,
}

impl RenderList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame.
    pub fn init(&mut self) {
        self.used = 0;
        self.opaque.clear();
        self.transparent.clear();
    }

    fn store(&mut self, mut item: RenderItem) -> usize {
        let index = self.used;
        item.id = index as u32;
        if index < self.items.len() {
            self.items[index] = item;
        } else {
            self.items.push(item);
        }
        self.used += 1;
        index
    }

    /// Appends `item` to the opaque or transparent list. Its `id` is
    /// reassigned to its push position.
    pub fn push(&mut self, item: RenderItem, transparent: bool) {
        let index = self.store(item);
        if transparent {
            self.transparent.push(index);
        } else {
            self.opaque.push(index);
        }
    }

    /// Inserts `item` at the front of the opaque or transparent list.
    pub fn unshift(&mut self, item: RenderItem, transparent: bool) {
        let index = self.store(item);
        if transparent {
            self.transparent.insert(0, index);
        } else {
            self.opaque.insert(0, index);
        }
    }

    /// Sorts both lists. The sort is stable.
    pub fn sort(&mut self, opaque: RenderItemComparator, transparent: RenderItemComparator) {
        let items = &self.items;
        self.opaque.sort_by(|&a, &b| opaque(&items[a], &items[b]));
        self.transparent.sort_by(|&a, &b| transparent(&items[a], &items[b]));
    }

    /// Drops items left over from larger previous frames.
    pub fn finish(&mut self) {
        self.items.truncate(self.used);
    }

    /// Opaque items in draw order.
    pub fn opaque(&self) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        self.opaque.iter().map(|&i| &self.items[i])
    }

    /// Transparent items in draw order.
    pub fn transparent(&self) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        self.transparent.iter().map(|&i| &self.items[i])
    }

    /// Number of items pushed this frame.
    pub fn len(&self) -> usize {
        self.used
    }

    /// Whether nothing was pushed this frame.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Storage currently held, including items not yet overwritten.
    pub fn capacity_in_use(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(material: AssetId<Material>, program_sort_id: u32, depth: f32) -> RenderItem {
        RenderItem {
            id: 0,
            object: AssetId::generate(),
            object_index: 0,
            geometry: AssetId::generate(),
            material,
            program_sort_id,
            group_order: 0,
            render_order: 0,
            depth,
            group: None,
        }
    }

    fn depths<'a>(items: impl Iterator<Item = &'a RenderItem>) -> Vec<f32> {
        items.map(|i| i.depth).collect()
    }

    #[test]
    fn test_transparent_back_to_front() {
        let material = AssetId::generate();
        let mut list = RenderList::new();
        list.init();
        for depth in [1.0, 2.0, 3.0] {
            list.push(item(material, 1, depth), true);
        }
        list.sort(painter_sort_stable, reverse_painter_sort_stable);
        assert_eq!(depths(list.transparent()), [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_opaque_groups_by_program_then_front_to_back() {
        let (m1, m2) = (AssetId::generate(), AssetId::generate());
        let mut list = RenderList::new();
        list.init();
        list.push(item(m2, 2, 1.0), false);
        list.push(item(m1, 1, 5.0), false);
        list.push(item(m1, 1, 2.0), false);
        list.sort(painter_sort_stable, reverse_painter_sort_stable);
        let order: Vec<_> = list.opaque().map(|i| (i.program_sort_id, i.depth)).collect();
        assert_eq!(order, [(1, 2.0), (1, 5.0), (2, 1.0)]);
    }

    #[test]
    fn test_sort_is_deterministic_for_ties() {
        let material = AssetId::generate();
        let mut list = RenderList::new();
        list.init();
        for _ in 0..8 {
            list.push(item(material, 1, 1.0), false);
        }
        list.sort(painter_sort_stable, reverse_painter_sort_stable);
        let ids: Vec<_> = list.opaque().map(|i| i.id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_render_order_overrides_depth() {
        let material = AssetId::generate();
        let mut list = RenderList::new();
        list.init();
        let mut late = item(material, 1, 1.0);
        late.render_order = 1;
        list.push(late, true);
        list.push(item(material, 1, 0.5), true);
        list.sort(painter_sort_stable, reverse_painter_sort_stable);
        assert_eq!(depths(list.transparent()), [0.5, 1.0]);
    }

    #[test]
    fn test_unshift_and_finish() {
        let material = AssetId::generate();
        let mut list = RenderList::new();
        list.init();
        for depth in [1.0, 2.0, 3.0] {
            list.push(item(material, 1, depth), false);
        }
        list.unshift(item(material, 1, 9.0), false);
        assert_eq!(depths(list.opaque()), [9.0, 1.0, 2.0, 3.0]);
        list.finish();

        list.init();
        list.push(item(material, 1, 4.0), false);
        list.finish();
        assert_eq!(list.len(), 1);
        assert_eq!(list.capacity_in_use(), 1);
        assert_eq!(depths(list.opaque()), [4.0]);
    }

    #[test]
    fn test_nan_depth_does_not_break_sorting() {
        let material = AssetId::generate();
        let mut list = RenderList::new();
        list.init();
        list.push(item(material, 1, f32::NAN), true);
        list.push(item(material, 1, 1.0), true);
        list.sort(painter_sort_stable, reverse_painter_sort_stable);
        assert_eq!(list.transparent().len(), 2);
    }
}
