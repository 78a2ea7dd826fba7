//! Runtime-typed attribute values handed out by scene delegates.
//!
//! Every instance primvar is an array with one element per authored
//! instance. The accessors fail closed: asking for the wrong element type
//! yields `None` instead of a panic.

use hdmax_math::{DMat4, Quat, QuatH, Vec3, Vec4};

/// Element type of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Empty,
    Int,
    Float,
    Float3,
    Float4,
    Quatf,
    Quath,
    Matrix4d,
}

/// A per-instance attribute value (tagged variant over the supported arrays).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value authored this frame
    #[default]
    Empty,
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Float3Array(Vec<Vec3>),
    Float4Array(Vec<Vec4>),
    QuatfArray(Vec<Quat>),
    QuathArray(Vec<QuatH>),
    Matrix4dArray(Vec<DMat4>),
}

impl Value {
    /// Element type tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Empty => ValueType::Empty,
            Value::IntArray(_) => ValueType::Int,
            Value::FloatArray(_) => ValueType::Float,
            Value::Float3Array(_) => ValueType::Float3,
            Value::Float4Array(_) => ValueType::Float4,
            Value::QuatfArray(_) => ValueType::Quatf,
            Value::QuathArray(_) => ValueType::Quath,
            Value::Matrix4dArray(_) => ValueType::Matrix4d,
        }
    }

    /// Check if no value is held. An empty array is still a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Value::Empty => 0,
            Value::IntArray(v) => v.len(),
            Value::FloatArray(v) => v.len(),
            Value::Float3Array(v) => v.len(),
            Value::Float4Array(v) => v.len(),
            Value::QuatfArray(v) => v.len(),
            Value::QuathArray(v) => v.len(),
            Value::Matrix4dArray(v) => v.len(),
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Value::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float3_array(&self) -> Option<&[Vec3]> {
        match self {
            Value::Float3Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float4_array(&self) -> Option<&[Vec4]> {
        match self {
            Value::Float4Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_quatf_array(&self) -> Option<&[Quat]> {
        match self {
            Value::QuatfArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_quath_array(&self) -> Option<&[QuatH]> {
        match self {
            Value::QuathArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix4d_array(&self) -> Option<&[DMat4]> {
        match self {
            Value::Matrix4dArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<Vec3>> for Value {
    fn from(v: Vec<Vec3>) -> Self {
        Value::Float3Array(v)
    }
}

impl From<Vec<Vec4>> for Value {
    fn from(v: Vec<Vec4>) -> Self {
        Value::Float4Array(v)
    }
}

impl From<Vec<Quat>> for Value {
    fn from(v: Vec<Quat>) -> Self {
        Value::QuatfArray(v)
    }
}

impl From<Vec<QuatH>> for Value {
    fn from(v: Vec<QuatH>) -> Self {
        Value::QuathArray(v)
    }
}

impl From<Vec<DMat4>> for Value {
    fn from(v: Vec<DMat4>) -> Self {
        Value::Matrix4dArray(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::FloatArray(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntArray(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_fail_closed() {
        let value = Value::from(vec![Vec3::ONE, Vec3::ZERO]);

        assert_eq!(value.value_type(), ValueType::Float3);
        assert_eq!(value.len(), 2);
        assert!(value.as_float3_array().is_some());
        assert!(value.as_float4_array().is_none());
        assert!(value.as_matrix4d_array().is_none());
    }

    #[test]
    fn test_empty_array_is_not_empty_value() {
        let value = Value::from(Vec::<Vec3>::new());
        assert!(!value.is_empty());
        assert_eq!(value.len(), 0);
        assert!(Value::Empty.is_empty());
    }
}
