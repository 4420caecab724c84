//! Pokémon type reference data

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TypeStyle {
    pub color: &'static str,
    pub icon: &'static str,
}

pub const POKEMON_TYPES: [(&str, TypeStyle); 18] = [
    ("normal", TypeStyle { color: "#A8A878", icon: "fa-circle" }),
    ("fire", TypeStyle { color: "#F08030", icon: "fa-fire" }),
    ("water", TypeStyle { color: "#6890F0", icon: "fa-droplet" }),
    ("electric", TypeStyle { color: "#F8D030", icon: "fa-bolt" }),
    ("grass", TypeStyle { color: "#78C850", icon: "fa-leaf" }),
    ("ice", TypeStyle { color: "#98D8D8", icon: "fa-snowflake" }),
    ("fighting", TypeStyle { color: "#C03028", icon: "fa-hand-fist" }),
    ("poison", TypeStyle { color: "#A040A0", icon: "fa-skull-crossbones" }),
    ("ground", TypeStyle { color: "#E0C068", icon: "fa-mountain" }),
    ("flying", TypeStyle { color: "#A890F0", icon: "fa-feather" }),
    ("psychic", TypeStyle { color: "#F85888", icon: "fa-brain" }),
    ("bug", TypeStyle { color: "#A8B820", icon: "fa-bug" }),
    ("rock", TypeStyle { color: "#B8A038", icon: "fa-gem" }),
    ("ghost", TypeStyle { color: "#705898", icon: "fa-ghost" }),
    ("dragon", TypeStyle { color: "#7038F8", icon: "fa-dragon" }),
    ("dark", TypeStyle { color: "#705848", icon: "fa-moon" }),
    ("steel", TypeStyle { color: "#B8B8D0", icon: "fa-shield" }),
    ("fairy", TypeStyle { color: "#EE99AC", icon: "fa-star" }),
];

/// Type name -> display style
pub fn type_data() -> BTreeMap<&'static str, TypeStyle> {
    POKEMON_TYPES.iter().copied().collect()
}

/// Zeroed counter for every known type
pub fn empty_type_counts() -> BTreeMap<String, u32> {
    POKEMON_TYPES.iter().map(|(name, _)| (name.to_string(), 0)).collect()
}
