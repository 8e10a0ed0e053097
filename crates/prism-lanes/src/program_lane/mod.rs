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

//! Program lane: everything between a material and a linked GPU program.
//!
//! [`ProgramParameters`] captures every input that changes generated shader
//! code and folds it into a [`ProgramKey`]. [`ProgramSource`] turns the
//! parameters into GLSL, and [`ProgramCache`] shares one compiled program
//! between every material whose key matches.

mod cache;
mod parameters;
mod source;

pub use self::cache::{ProgramCache, ProgramEntry, ProgramHandle};
pub use self::parameters::{
    FeatureFlags, LightsHash, ProgramEnvironment, ProgramKey, ProgramParameters,
};
pub use self::source::ProgramSource;
