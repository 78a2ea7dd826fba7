//! Instancer primvar names.
//!
//! USD 23.11 renamed the synthesized instancer primvars. Scene delegates built
//! against older releases still author the legacy names, so the naming scheme
//! is selectable.

use serde::{Deserialize, Serialize};

use crate::path::Token;

/// Which set of instancer primvar names the scene delegate authors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimvarNaming {
    /// `instanceTranslations`, `instanceRotations`, `instanceScales`, `instanceTransforms`
    #[default]
    Modern,

    /// `translate`, `rotate`, `scale`, `instanceTransform`
    Legacy,
}

/// The four per-instance primvars that feed instance transforms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstancerTokens {
    /// Per-instance translation (float3)
    pub translations: Token,

    /// Per-instance rotation (quaternion, or float4 as real-first quaternion)
    pub rotations: Token,

    /// Per-instance scale (float3, or float for uniform scale)
    pub scales: Token,

    /// Per-instance full transform (matrix4d)
    pub transforms: Token,
}

impl InstancerTokens {
    /// Token set for a naming scheme.
    pub fn for_naming(naming: PrimvarNaming) -> Self {
        match naming {
            PrimvarNaming::Modern => Self {
                translations: Token::new("instanceTranslations"),
                rotations: Token::new("instanceRotations"),
                scales: Token::new("instanceScales"),
                transforms: Token::new("instanceTransforms"),
            },
            PrimvarNaming::Legacy => Self {
                translations: Token::new("translate"),
                rotations: Token::new("rotate"),
                scales: Token::new("scale"),
                transforms: Token::new("instanceTransform"),
            },
        }
    }
}

impl Default for InstancerTokens {
    fn default() -> Self {
        Self::for_naming(PrimvarNaming::default())
    }
}
