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

//! Shader program descriptors, reflection data, and uniform values.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
}

/// Complete sources for one program, as passed to
/// [`GraphicsDevice::create_program`](crate::renderer::GraphicsDevice::create_program).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDescriptor {
    /// Debug label.
    pub label: String,
    /// Full vertex stage source.
    pub vertex_source: String,
    /// Full fragment stage source.
    pub fragment_source: String,
}

/// The declared type of an active uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum UniformType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler2D,
}

impl UniformType {
    /// Parses a shading-language type name.
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "float" => UniformType::Float,
            "int" | "bool" => UniformType::Int,
            "vec2" => UniformType::Vec2,
            "vec3" => UniformType::Vec3,
            "vec4" => UniformType::Vec4,
            "mat3" => UniformType::Mat3,
            "mat4" => UniformType::Mat4,
            "sampler2D" => UniformType::Sampler2D,
            _ => return None,
        })
    }
}

/// An active uniform reported by program reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Name without array suffix.
    pub name: String,
    /// Location to pass to
    /// [`GraphicsDevice::set_uniform`](crate::renderer::GraphicsDevice::set_uniform).
    pub location: super::UniformLocation,
    /// Declared type.
    pub ty: UniformType,
    /// Array length, 1 for scalars.
    pub array_len: u32,
}

/// An active vertex input reported by program reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    /// Attribute name.
    pub name: String,
    /// Slot to feed with
    /// [`set_vertex_attribute`](crate::renderer::GraphicsDevice::set_vertex_attribute).
    pub location: super::AttributeLocation,
    /// Number of components of the declared type.
    pub components: u32,
}

/// Everything a linked program exposes to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    /// Active uniforms.
    pub uniforms: Vec<ActiveUniform>,
    /// Active vertex inputs.
    pub attributes: Vec<ActiveAttribute>,
}

/// A value bound to a uniform slot.
///
/// Samplers are bound as texture unit indices through [`UniformValue::Int`]
/// (or [`UniformValue::IntArray`] for sampler arrays).
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    Vec2Array(Vec<Vec2>),
    Vec3Array(Vec<Vec3>),
    Vec4Array(Vec<Vec4>),
    Mat4Array(Vec<Mat4>),
}

impl UniformValue {
    /// Returns `true` if the value can be stored in a slot of type `ty`.
    pub fn matches(&self, ty: UniformType) -> bool {
        use UniformValue as V;
        matches!(
            (self, ty),
            (V::Float(_) | V::FloatArray(_), UniformType::Float)
                | (V::Int(_) | V::IntArray(_), UniformType::Int | UniformType::Sampler2D)
                | (V::Vec2(_) | V::Vec2Array(_), UniformType::Vec2)
                | (V::Vec3(_) | V::Vec3Array(_), UniformType::Vec3)
                | (V::Vec4(_) | V::Vec4Array(_), UniformType::Vec4)
                | (V::Mat3(_), UniformType::Mat3)
                | (V::Mat4(_) | V::Mat4Array(_), UniformType::Mat4)
        )
    }

    /// Convenience constructor for boolean flags.
    pub fn bool(value: bool) -> Self {
        UniformValue::Int(i32::from(value))
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_glsl() {
        assert_eq!(UniformType::from_glsl("mat4"), Some(UniformType::Mat4));
        assert_eq!(UniformType::from_glsl("bool"), Some(UniformType::Int));
        assert_eq!(UniformType::from_glsl("samplerCube"), None);
    }

    #[test]
    fn test_value_matches_type() {
        assert!(UniformValue::Int(3).matches(UniformType::Sampler2D));
        assert!(UniformValue::Vec3Array(vec![Vec3::ONE]).matches(UniformType::Vec3));
        assert!(!UniformValue::Float(1.0).matches(UniformType::Vec3));
        assert!(UniformValue::bool(true) == UniformValue::Int(1));
    }
}
