// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layer-name tokenizer and abbreviation expansion

use std::collections::BTreeSet;

use smallvec::SmallVec;

/// Raw tokens of one layer name. Layer names rarely exceed six parts.
pub type Tokens = SmallVec<[String; 6]>;

/// Abbreviations drafters use in layer names, with the words they stand for.
const TOKEN_EXPANSIONS: &[(&str, &[&str])] = &[
    ("RM", &["ROOM"]),
    ("RMS", &["ROOM"]),
    ("FLR", &["FLOOR"]),
    ("FL", &["FLOOR"]),
    ("FLRS", &["FLOOR"]),
    ("CLG", &["CEILING"]),
    ("CL", &["CEILING"]),
    ("CLNG", &["CEILING"]),
    ("SLB", &["SLAB"]),
    ("SLBS", &["SLAB"]),
    ("COL", &["COLUMN"]),
    ("COLS", &["COLUMN"]),
    ("STR", &["STRUCTURE", "STRUCTURAL"]),
    ("STRL", &["STRUCTURAL"]),
    ("MECH", &["MECHANICAL"]),
    ("ELEC", &["ELECTRICAL"]),
    ("ELE", &["ELECTRICAL"]),
    ("PWR", &["POWER"]),
    ("PLMB", &["PLUMBING"]),
    ("PLUM", &["PLUMBING"]),
    ("PLUMB", &["PLUMBING"]),
    ("SAN", &["SANITARY"]),
    ("HVAC", &["HVAC", "MECHANICAL"]),
    ("DUCT", &["DUCT"]),
    ("FP", &["FIRE"]),
    ("GRID", &["GRID"]),
    ("AX", &["AXIS"]),
    ("AXES", &["AXIS"]),
    ("FURN", &["FURNITURE"]),
    ("CASE", &["CASEWORK"]),
    ("CAB", &["CABINET"]),
    ("KIT", &["KITCHEN"]),
    ("BATH", &["BATHROOM"]),
    ("APPL", &["APPLIANCE"]),
    ("EQ", &["EQUIPMENT"]),
    ("EQUIP", &["EQUIPMENT"]),
    ("DATA", &["DATA"]),
    ("TEL", &["TELECOM"]),
    ("TELCO", &["TELECOM"]),
];

/// Uppercase `name` and split it on every run of non-alphanumeric characters.
///
/// `tokenize(join(tokenize(x), "-")) == tokenize(x)` holds for any input.
pub fn tokenize(name: &str) -> Tokens {
    name.to_uppercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expansions of a single token, empty when it is not an abbreviation.
pub fn expansions_of(token: &str) -> &'static [&'static str] {
    TOKEN_EXPANSIONS
        .iter()
        .find(|(abbr, _)| *abbr == token)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

/// Raw tokens plus every expansion. The originals are always kept.
pub fn expand(tokens: &[String]) -> BTreeSet<String> {
    let mut expanded: BTreeSet<String> = tokens.iter().cloned().collect();
    for token in tokens {
        expanded.extend(expansions_of(token).iter().map(|w| w.to_string()));
    }
    expanded
}
