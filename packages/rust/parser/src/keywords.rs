//! The closed set of recognized scene directives.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Directive that pulls another source file into the current one.
pub const INCLUDE: &str = "Include";

/// Every directive name that starts a block.
pub const KEYWORDS: [&str; 39] = [
    "AttributeBegin",
    "AttributeEnd",
    "Attribute",
    "ActiveTransform",
    "AreaLightSource",
    "Accelerator",
    "ConcatTransform",
    "CoordinateSystem",
    "CoordSysTransform",
    "ColorSpace",
    "Camera",
    "Film",
    "Integrator",
    INCLUDE,
    "Identity",
    "LightSource",
    "LookAt",
    "MakeNamedMaterial",
    "MakeNamedMedium",
    "Material",
    "MediumInterface",
    "NamedMaterial",
    "ObjectBegin",
    "ObjectEnd",
    "ObjectInstance",
    "Option",
    "PixelFilter",
    "ReverseOrientation",
    "Rotate",
    "Shape",
    "Sampler",
    "Scale",
    "TransformBegin",
    "TransformEnd",
    "Transform",
    "Translate",
    "TransformTimes",
    "Texture",
    "WorldBegin",
];

static KEYWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KEYWORDS.into_iter().collect());

/// Whether `token` names a recognized directive (case-sensitive).
pub fn is_keyword(token: &str) -> bool {
    KEYWORD_SET.contains(token)
}
