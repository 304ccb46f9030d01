// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static rule tables for layer classification

use super::{Discipline, LayerCategory};

/// One category rule: token keywords, raw-name substrings, and what a match
/// implies about the drawing discipline and building system.
#[derive(Debug)]
pub struct LayerRule {
    pub category: LayerCategory,
    pub keywords: &'static [&'static str],
    pub patterns: &'static [&'static str],
    pub discipline: Discipline,
    pub system: &'static str,
    pub priority: u32,
}

pub static LAYER_RULES: &[LayerRule] = &[
    LayerRule {
        category: LayerCategory::Wall,
        keywords: &["WALL", "WALLS", "PARTITION", "PART", "PWALL", "ENCL", "MUR"],
        patterns: &["A-WALL", "C-WALL", "WALL-"],
        discipline: Discipline::Architectural,
        system: "enclosure",
        priority: 95,
    },
    LayerRule {
        category: LayerCategory::Door,
        keywords: &["DOOR", "DOORS", "DOORFRAME", "JAMB"],
        patterns: &["A-DOOR", "DOOR-"],
        discipline: Discipline::Architectural,
        system: "openings",
        priority: 85,
    },
    LayerRule {
        category: LayerCategory::Window,
        keywords: &["WINDOW", "WINDOWS", "WIN", "GLAZ", "GLASS"],
        patterns: &["A-WINDOW", "WINDOW-"],
        discipline: Discipline::Architectural,
        system: "openings",
        priority: 82,
    },
    LayerRule {
        category: LayerCategory::Floor,
        keywords: &["FLOOR", "FLOORS", "SLAB", "FINISH", "TILE", "TILING"],
        patterns: &["A-FLOOR", "SLAB-"],
        discipline: Discipline::Architectural,
        system: "floor_finish",
        priority: 78,
    },
    LayerRule {
        category: LayerCategory::Ceiling,
        keywords: &["CEILING", "CEILINGS", "CLG", "SOFFIT"],
        patterns: &["A-CEILING", "CEIL-"],
        discipline: Discipline::Architectural,
        system: "ceiling_finish",
        priority: 76,
    },
    LayerRule {
        category: LayerCategory::Space,
        keywords: &["ROOM", "SPACE", "ZONE", "AREA"],
        patterns: &["A-AREA", "A-ROOM"],
        discipline: Discipline::Architectural,
        system: "space",
        priority: 74,
    },
    LayerRule {
        category: LayerCategory::Dimension,
        keywords: &["DIM", "DIMENSION"],
        patterns: &["A-DIM", "DIM-"],
        discipline: Discipline::Annotation,
        system: "dimensioning",
        priority: 60,
    },
    LayerRule {
        category: LayerCategory::Text,
        keywords: &["TEXT", "NOTE", "ANNOTATION", "ANNO", "TAG", "LABEL"],
        patterns: &["A-ANNO", "A-TEXT"],
        discipline: Discipline::Annotation,
        system: "documentation",
        priority: 58,
    },
    LayerRule {
        category: LayerCategory::StructureColumn,
        keywords: &["COLUMN", "COLUMNS", "COL", "PIER", "PILE"],
        patterns: &["S-COL", "STR-COL"],
        discipline: Discipline::Structural,
        system: "column",
        priority: 88,
    },
    LayerRule {
        category: LayerCategory::StructureBeam,
        keywords: &["BEAM", "BEAMS", "GIRDER", "BRACE", "FRAMING"],
        patterns: &["S-BEAM", "STR-BEAM"],
        discipline: Discipline::Structural,
        system: "beam",
        priority: 86,
    },
    LayerRule {
        category: LayerCategory::StructureFoundation,
        keywords: &["FOUNDATION", "FOUND", "FOOTING", "PILECAP", "MAT"],
        patterns: &["S-FOOT", "S-FOUND"],
        discipline: Discipline::Structural,
        system: "foundation",
        priority: 80,
    },
    LayerRule {
        category: LayerCategory::Stair,
        keywords: &["STAIR", "STAIRS", "STEP", "STEPS"],
        patterns: &["A-STAIR"],
        discipline: Discipline::Architectural,
        system: "vertical_transport",
        priority: 72,
    },
    LayerRule {
        category: LayerCategory::Furniture,
        keywords: &[
            "FURNITURE", "FURN", "CASEWORK", "CABINET", "MILLWORK", "FFE", "SOFA", "BED",
            "WARDROBE", "DESK", "TABLE",
        ],
        patterns: &["I-FURN", "A-FURN"],
        discipline: Discipline::Interior,
        system: "furniture",
        priority: 70,
    },
    LayerRule {
        category: LayerCategory::Equipment,
        keywords: &["EQUIPMENT", "EQUIP", "APPLIANCE", "APPL", "CASEWORK"],
        patterns: &["ME-EQ", "EQP-"],
        discipline: Discipline::Equipment,
        system: "equipment",
        priority: 68,
    },
    LayerRule {
        category: LayerCategory::MepPlumbing,
        keywords: &[
            "PLUMBING", "PLUMB", "SANITARY", "SAN", "WASTE", "VENT", "PIPE", "PIPING", "WATER",
            "WTR", "SEWER", "DRAIN",
        ],
        patterns: &["P-PLUM", "MEP-PLUM", "PLUMB-"],
        discipline: Discipline::Plumbing,
        system: "plumbing",
        priority: 84,
    },
    LayerRule {
        category: LayerCategory::MepHvac,
        keywords: &[
            "HVAC", "MECHANICAL", "MECH", "DUCT", "VENT", "AIR", "AC", "VAV", "FCU", "AHU",
            "SUPPLY", "RETURN",
        ],
        patterns: &["M-HVAC", "M-DUCT", "MEP-HVAC"],
        discipline: Discipline::Mechanical,
        system: "hvac",
        priority: 84,
    },
    LayerRule {
        category: LayerCategory::MepElectrical,
        keywords: &[
            "ELECTRICAL", "ELECT", "ELEC", "POWER", "PWR", "LIGHT", "LIGHTING", "LTS", "SWITCH",
            "PANEL", "CONDUIT", "CABLE", "DATA", "TELECOM", "SECURITY",
        ],
        patterns: &["E-POWR", "E-LITE", "MEP-ELEC"],
        discipline: Discipline::Electrical,
        system: "electrical",
        priority: 84,
    },
    LayerRule {
        category: LayerCategory::MepFireProtection,
        keywords: &["FIRE", "SPRINKLER", "SPRINK", "FP", "ALARM"],
        patterns: &["FP-", "FIRE-"],
        discipline: Discipline::FireProtection,
        system: "fire_protection",
        priority: 75,
    },
    LayerRule {
        category: LayerCategory::Landscape,
        keywords: &["SITE", "LAND", "PLANT", "TREE", "LANDSCAPE", "HARDSCAPE", "GRADE", "TOPO"],
        patterns: &["C-LAND", "SITE-"],
        discipline: Discipline::Site,
        system: "landscape",
        priority: 60,
    },
    LayerRule {
        category: LayerCategory::Grid,
        keywords: &["GRID", "AXIS", "AXES"],
        patterns: &["GRID-", "AXIS-"],
        discipline: Discipline::Structural,
        system: "grid",
        priority: 62,
    },
    LayerRule {
        category: LayerCategory::Roof,
        keywords: &["ROOF", "ROOFING"],
        patterns: &["A-ROOF"],
        discipline: Discipline::Architectural,
        system: "roof",
        priority: 70,
    },
];

/// Discipline prefixes and words, checked in order when no rule matched.
pub static DISCIPLINE_HINTS: &[(Discipline, &[&str])] = &[
    (
        Discipline::Architectural,
        &["A", "AR", "ARCH", "INT", "FIN", "ROOM", "SPACE", "FURNITURE"],
    ),
    (
        Discipline::Structural,
        &["S", "STR", "STRUCT", "STRUCTURAL", "GRID", "AXIS"],
    ),
    (
        Discipline::Mechanical,
        &["M", "MECH", "MECHANICAL", "HVAC", "DUCT", "AIR"],
    ),
    (
        Discipline::Electrical,
        &["E", "ELEC", "ELECT", "POWER", "LIGHT", "DATA"],
    ),
    (Discipline::Plumbing, &["P", "PLUMB", "SAN", "PIPE", "WASTE"]),
    (Discipline::FireProtection, &["FP", "FIRE", "SPRINK"]),
    (Discipline::Site, &["C", "CIVIL", "SITE", "LAND"]),
];

/// Substring checks over the raw uppercased name, first hit wins.
pub static LEGACY_PATTERNS: &[(LayerCategory, &[&str])] = &[
    (LayerCategory::Wall, &["WALL", "MUR", "WALLS", "A-WALL"]),
    (LayerCategory::Door, &["DOOR", "DOORS", "A-DOOR"]),
    (LayerCategory::Window, &["WINDOW", "WINDOWS", "WIN", "A-WINDOW"]),
    (LayerCategory::Floor, &["FLOOR", "SLAB", "FLOORS", "A-FLOOR"]),
    (LayerCategory::Ceiling, &["CEILING", "CEIL", "A-CEILING"]),
    (LayerCategory::Space, &["ROOM", "SPACE", "AREA", "A-AREA"]),
    (LayerCategory::Text, &["TEXT", "TEXTS", "LABEL", "NOTE"]),
    (LayerCategory::Dimension, &["DIM", "DIMS", "DIMENSION"]),
    (LayerCategory::Structure, &["BEAM", "COLUMN", "STRUCTURE"]),
];

/// Discipline implied by a category alone.
pub fn category_discipline(category: LayerCategory) -> Option<Discipline> {
    if category == LayerCategory::Structure {
        return Some(Discipline::Structural);
    }
    LAYER_RULES
        .iter()
        .find(|rule| rule.category == category)
        .map(|rule| rule.discipline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_is_well_formed() {
        for rule in LAYER_RULES {
            assert!(!rule.keywords.is_empty(), "{:?}", rule.category);
            assert!((58..=95).contains(&rule.priority), "{:?}", rule.category);
            for kw in rule.keywords {
                assert_eq!(kw.to_uppercase(), *kw);
            }
        }
        assert_eq!(LAYER_RULES.len(), 21);
    }

    #[test]
    fn test_category_discipline() {
        assert_eq!(
            category_discipline(LayerCategory::Door),
            Some(Discipline::Architectural)
        );
        assert_eq!(
            category_discipline(LayerCategory::Structure),
            Some(Discipline::Structural)
        );
        assert_eq!(category_discipline(LayerCategory::Other), None);
    }
}
