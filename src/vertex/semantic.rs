//! Vertex attribute semantics.

use std::fmt;

/// Engine-side attribute semantic.
///
/// Declaration order is the canonical interleaving order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    Color,
    BlendIndices,
    BlendWeight,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
    TexCoord4,
    TexCoord5,
    TexCoord6,
    TexCoord7,
}

impl Semantic {
    /// Map a glTF attribute name. Unrecognised names yield `None`.
    pub fn from_gltf(name: &str) -> Option<Self> {
        Some(match name {
            "POSITION" => Self::Position,
            "NORMAL" => Self::Normal,
            "TANGENT" => Self::Tangent,
            "COLOR_0" => Self::Color,
            "JOINTS_0" => Self::BlendIndices,
            "WEIGHTS_0" => Self::BlendWeight,
            "TEXCOORD_0" => Self::TexCoord0,
            "TEXCOORD_1" => Self::TexCoord1,
            "TEXCOORD_2" => Self::TexCoord2,
            "TEXCOORD_3" => Self::TexCoord3,
            "TEXCOORD_4" => Self::TexCoord4,
            "TEXCOORD_5" => Self::TexCoord5,
            "TEXCOORD_6" => Self::TexCoord6,
            "TEXCOORD_7" => Self::TexCoord7,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::Color => "COLOR",
            Self::BlendIndices => "BLENDINDICES",
            Self::BlendWeight => "BLENDWEIGHT",
            Self::TexCoord0 => "TEXCOORD0",
            Self::TexCoord1 => "TEXCOORD1",
            Self::TexCoord2 => "TEXCOORD2",
            Self::TexCoord3 => "TEXCOORD3",
            Self::TexCoord4 => "TEXCOORD4",
            Self::TexCoord5 => "TEXCOORD5",
            Self::TexCoord6 => "TEXCOORD6",
            Self::TexCoord7 => "TEXCOORD7",
        }
    }

    /// True for the two channels whose V coordinate may need flipping.
    #[inline]
    pub const fn is_flippable_texcoord(self) -> bool {
        matches!(self, Self::TexCoord0 | Self::TexCoord1)
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
