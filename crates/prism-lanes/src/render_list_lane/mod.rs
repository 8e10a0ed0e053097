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

//! Render list lane: the per-frame, per-scene list of draws, split into
//! opaque and transparent items and sorted for submission.

mod list;
mod lists;

pub use self::list::{
    painter_sort_stable, reverse_painter_sort_stable, RenderItem, RenderItemComparator, RenderList,
};
pub use self::lists::RenderLists;
