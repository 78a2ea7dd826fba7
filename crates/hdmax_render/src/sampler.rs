//! Typed random access into primvar buffers.
//!
//! A buffer holds whatever array type the scene delegate authored. The
//! sampler hands back an element only when the requested type matches the
//! stored type exactly and the index is in range; anything else is reported
//! as absence so callers can try another representation.

use hdmax_core::{Token, Value, ValueType};
use hdmax_math::{DMat4, Quat, QuatH, Vec3, Vec4};

/// The latest value of one instance primvar, owned by an instancer's cache.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimvarBuffer {
    name: Token,
    value: Value,
}

impl PrimvarBuffer {
    pub fn new(name: Token, value: Value) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &Token {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Element type of the stored array.
    pub fn element_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element types that can be read out of a [`PrimvarBuffer`].
pub trait Sample: Sized + Copy {
    /// The stored element type this type reads.
    const ELEMENT_TYPE: ValueType;

    /// Read element `index`, or `None` on type mismatch or out of range.
    fn sample_from(value: &Value, index: usize) -> Option<Self>;
}

macro_rules! impl_sample {
    ($ty:ty, $element:expr, $accessor:ident) => {
        impl Sample for $ty {
            const ELEMENT_TYPE: ValueType = $element;

            fn sample_from(value: &Value, index: usize) -> Option<Self> {
                value.$accessor()?.get(index).copied()
            }
        }
    };
}

impl_sample!(i32, ValueType::Int, as_int_array);
impl_sample!(f32, ValueType::Float, as_float_array);
impl_sample!(Vec3, ValueType::Float3, as_float3_array);
impl_sample!(Vec4, ValueType::Float4, as_float4_array);
impl_sample!(Quat, ValueType::Quatf, as_quatf_array);
impl_sample!(QuatH, ValueType::Quath, as_quath_array);
impl_sample!(DMat4, ValueType::Matrix4d, as_matrix4d_array);

/// Reads typed elements from one buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferSampler<'a> {
    buffer: &'a PrimvarBuffer,
}

impl<'a> BufferSampler<'a> {
    pub fn new(buffer: &'a PrimvarBuffer) -> Self {
        Self { buffer }
    }

    /// Sample the element at `index` as `T`.
    ///
    /// Negative indices, indices past the end, and element-type mismatches
    /// all yield `None`.
    pub fn sample<T: Sample>(&self, index: i32) -> Option<T> {
        if self.buffer.element_type() != T::ELEMENT_TYPE {
            return None;
        }
        let index = usize::try_from(index).ok()?;
        T::sample_from(self.buffer.value(), index)
    }
}
