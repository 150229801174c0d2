//! Closed registries for keyvalue types, entity classes and header helpers.
//!
//! Each registry that reaches the binary format has an explicit ordinal table.
//! The tables are append-only: new variants go at the end so packs written by
//! older builds keep decoding.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Void,
    Choices,
    SpawnFlags,

    String,
    Bool,
    Int,
    Float,
    Vector,
    Angles,

    TargetDest,
    TargetDestClass,
    TargetSource,
    TargetNpcClass,
    TargetPointClass,
    TargetFilterName,
    TargetNodeDest,
    TargetNodeSource,

    Scene,
    Sound,
    Particle,
    Sprite,
    Decal,
    Material,
    Model,
    VScriptList,
    VScript,

    AngleNegPitch,
    VecLine,
    VecOrigin,
    VecAxis,
    Color1,
    Color255,
    SideList,

    InstanceFile,
    InstanceVarDef,
    InstanceVarRep,
}

/// Binary ordinal of every [`ValueType`]. Append new types only.
pub const VALUE_TYPE_ORDER: [ValueType; 36] = [
    ValueType::Void,
    ValueType::Choices,
    ValueType::SpawnFlags,
    ValueType::String,
    ValueType::Bool,
    ValueType::Int,
    ValueType::Float,
    ValueType::Vector,
    ValueType::Angles,
    ValueType::TargetDest,
    ValueType::TargetDestClass,
    ValueType::TargetSource,
    ValueType::TargetNpcClass,
    ValueType::TargetPointClass,
    ValueType::TargetFilterName,
    ValueType::TargetNodeDest,
    ValueType::TargetNodeSource,
    ValueType::Scene,
    ValueType::Sound,
    ValueType::Particle,
    ValueType::Sprite,
    ValueType::Decal,
    ValueType::Material,
    ValueType::Model,
    ValueType::VScriptList,
    ValueType::AngleNegPitch,
    ValueType::VecLine,
    ValueType::VecOrigin,
    ValueType::VecAxis,
    ValueType::Color1,
    ValueType::Color255,
    ValueType::SideList,
    ValueType::InstanceFile,
    ValueType::InstanceVarDef,
    ValueType::InstanceVarRep,
    ValueType::VScript,
];

// The readonly flag shares the ordinal byte.
const _: () = assert!(VALUE_TYPE_ORDER.len() < 127);

impl ValueType {
    /// Name used in FGD text.
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Choices => "choices",
            Self::SpawnFlags => "flags",
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Vector => "vector",
            Self::Angles => "angle",
            Self::TargetDest => "target_destination",
            Self::TargetDestClass => "target_name_or_class",
            Self::TargetSource => "target_source",
            Self::TargetNpcClass => "npcclass",
            Self::TargetPointClass => "pointentityclass",
            Self::TargetFilterName => "filterclass",
            Self::TargetNodeDest => "node_dest",
            Self::TargetNodeSource => "node_id",
            Self::Scene => "scene",
            Self::Sound => "sound",
            Self::Particle => "particlesystem",
            Self::Sprite => "sprite",
            Self::Decal => "decal",
            Self::Material => "material",
            Self::Model => "studio",
            Self::VScriptList => "scriptlist",
            Self::VScript => "script",
            Self::AngleNegPitch => "angle_negative_pitch",
            Self::VecLine => "vecline",
            Self::VecOrigin => "origin",
            Self::VecAxis => "axis",
            Self::Color1 => "color1",
            Self::Color255 => "color255",
            Self::SideList => "sidelist",
            Self::InstanceFile => "instance_file",
            Self::InstanceVarDef => "instance_parm",
            Self::InstanceVarRep => "instance_variable",
        }
    }

    /// Case-insensitive lookup, accepting the `bool` and `int` aliases.
    pub fn from_name(raw: &str) -> Option<Self> {
        let folded = raw.trim().to_ascii_lowercase();
        match folded.as_str() {
            "bool" => return Some(Self::Bool),
            "int" => return Some(Self::Int),
            _ => {}
        }
        VALUE_TYPE_ORDER
            .iter()
            .copied()
            .find(|value_type| value_type.name() == folded)
    }

    /// Choices and spawnflags carry a `[ ... ]` value list.
    pub fn has_list(self) -> bool {
        matches!(self, Self::Choices | Self::SpawnFlags)
    }

    /// Defaults of these types are written without quotes.
    pub fn is_literal(self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Float)
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Void => 0,
            Self::Choices => 1,
            Self::SpawnFlags => 2,
            Self::String => 3,
            Self::Bool => 4,
            Self::Int => 5,
            Self::Float => 6,
            Self::Vector => 7,
            Self::Angles => 8,
            Self::TargetDest => 9,
            Self::TargetDestClass => 10,
            Self::TargetSource => 11,
            Self::TargetNpcClass => 12,
            Self::TargetPointClass => 13,
            Self::TargetFilterName => 14,
            Self::TargetNodeDest => 15,
            Self::TargetNodeSource => 16,
            Self::Scene => 17,
            Self::Sound => 18,
            Self::Particle => 19,
            Self::Sprite => 20,
            Self::Decal => 21,
            Self::Material => 22,
            Self::Model => 23,
            Self::VScriptList => 24,
            Self::AngleNegPitch => 25,
            Self::VecLine => 26,
            Self::VecOrigin => 27,
            Self::VecAxis => 28,
            Self::Color1 => 29,
            Self::Color255 => 30,
            Self::SideList => 31,
            Self::InstanceFile => 32,
            Self::InstanceVarDef => 33,
            Self::InstanceVarRep => 34,
            Self::VScript => 35,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        VALUE_TYPE_ORDER.get(usize::from(ordinal)).copied()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Base,
    Point,
    Brush,
    Rope,
    Track,
    Filter,
    Npc,
}

/// Binary ordinal of every [`EntityType`]. Append new types only.
pub const ENTITY_TYPE_ORDER: [EntityType; 7] = [
    EntityType::Base,
    EntityType::Point,
    EntityType::Brush,
    EntityType::Rope,
    EntityType::Track,
    EntityType::Filter,
    EntityType::Npc,
];

impl EntityType {
    /// Keyword after `@`, lowercase.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Base => "baseclass",
            Self::Point => "pointclass",
            Self::Brush => "solidclass",
            Self::Rope => "keyframeclass",
            Self::Track => "moveclass",
            Self::Filter => "filterclass",
            Self::Npc => "npcclass",
        }
    }

    /// Keyword as written on export.
    pub fn display_keyword(self) -> &'static str {
        match self {
            Self::Base => "BaseClass",
            Self::Point => "PointClass",
            Self::Brush => "SolidClass",
            Self::Rope => "KeyFrameClass",
            Self::Track => "MoveClass",
            Self::Filter => "FilterClass",
            Self::Npc => "NPCClass",
        }
    }

    pub fn from_keyword(raw: &str) -> Option<Self> {
        let folded = raw.to_ascii_lowercase();
        ENTITY_TYPE_ORDER
            .iter()
            .copied()
            .find(|entity_type| entity_type.keyword() == folded)
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Point => 1,
            Self::Brush => 2,
            Self::Rope => 3,
            Self::Track => 4,
            Self::Filter => 5,
            Self::Npc => 6,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        ENTITY_TYPE_ORDER.get(usize::from(ordinal)).copied()
    }
}

/// Directives allowed in an entity header, before the `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperType {
    /// `base(...)`; consumed by the parser, never stored as a helper.
    Inherit,
    HalfGridSnap,
    Cube,
    BoundingBox,
    Tint,
    Sphere,
    Line,
    Frustum,
    Cylinder,
    BrushSides,
    WireBox,
    SweptHull,
    Sprite,
    Model,
    ModelProp,
    ModelNegPitch,
    EntSprite,
    EntInstance,
    EntDecal,
    EntOverlay,
    EntOverlayWater,
    EntLight,
    EntLightCone,
    EntRope,
    EntTrack,
    EntBreakableSurf,
    EntWorldText,
    AppliesTo,
    OrderBy,
}

const HELPER_TYPES: [HelperType; 29] = [
    HelperType::Inherit,
    HelperType::HalfGridSnap,
    HelperType::Cube,
    HelperType::BoundingBox,
    HelperType::Tint,
    HelperType::Sphere,
    HelperType::Line,
    HelperType::Frustum,
    HelperType::Cylinder,
    HelperType::BrushSides,
    HelperType::WireBox,
    HelperType::SweptHull,
    HelperType::Sprite,
    HelperType::Model,
    HelperType::ModelProp,
    HelperType::ModelNegPitch,
    HelperType::EntSprite,
    HelperType::EntInstance,
    HelperType::EntDecal,
    HelperType::EntOverlay,
    HelperType::EntOverlayWater,
    HelperType::EntLight,
    HelperType::EntLightCone,
    HelperType::EntRope,
    HelperType::EntTrack,
    HelperType::EntBreakableSurf,
    HelperType::EntWorldText,
    HelperType::AppliesTo,
    HelperType::OrderBy,
];

impl HelperType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Inherit => "base",
            Self::HalfGridSnap => "halfgridsnap",
            Self::Cube => "size",
            Self::BoundingBox => "bbox",
            Self::Tint => "color",
            Self::Sphere => "sphere",
            Self::Line => "line",
            Self::Frustum => "frustum",
            Self::Cylinder => "cylinder",
            Self::BrushSides => "sidelist",
            Self::WireBox => "wirebox",
            Self::SweptHull => "sweptplayerhull",
            Self::Sprite => "iconsprite",
            Self::Model => "studio",
            Self::ModelProp => "studioprop",
            Self::ModelNegPitch => "lightprop",
            Self::EntSprite => "sprite",
            Self::EntInstance => "instance",
            Self::EntDecal => "decal",
            Self::EntOverlay => "overlay",
            Self::EntOverlayWater => "overlay_transition",
            Self::EntLight => "light",
            Self::EntLightCone => "lightcone",
            Self::EntRope => "keyframe",
            Self::EntTrack => "animator",
            Self::EntBreakableSurf => "quadbounds",
            Self::EntWorldText => "worldtext",
            Self::AppliesTo => "appliesto",
            Self::OrderBy => "orderby",
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        let folded = raw.to_ascii_lowercase();
        HELPER_TYPES
            .iter()
            .copied()
            .find(|helper| helper.name() == folded)
    }
}
