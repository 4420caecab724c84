//! Comparison and team coverage handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{AppState, AppResult, AppError};
use crate::models::{empty_type_counts, Pokemon, PokemonDetail};

pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 4;

#[derive(Debug, Deserialize)]
pub struct PokemonSelection {
    #[serde(default)]
    pub pokemon_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub pokemon: Vec<PokemonDetail>,
}

#[derive(Debug, Serialize)]
pub struct TeamAnalysis {
    pub type_coverage: BTreeMap<String, u32>,
    pub team_size: usize,
    pub pokemon: Vec<PokemonDetail>,
}

pub fn check_compare_size(count: usize) -> AppResult<()> {
    if count < MIN_COMPARE {
        return Err(AppError::ValidationError(format!("Select at least {} Pokemon", MIN_COMPARE)));
    }
    if count > MAX_COMPARE {
        return Err(AppError::ValidationError(format!("Maximum {} Pokemon allowed", MAX_COMPARE)));
    }
    Ok(())
}

/// Count how many members carry each type
pub fn type_coverage(team: &[Pokemon]) -> BTreeMap<String, u32> {
    let mut coverage = empty_type_counts();

    for member in team {
        let types = std::iter::once(member.main_type.as_str())
            .chain(member.secondary_type.as_deref())
            .filter(|t| !t.is_empty());

        for t in types {
            *coverage.entry(t.to_lowercase()).or_insert(0) += 1;
        }
    }

    coverage
}

/// Side-by-side stats for 2 to 4 Pokémon
pub async fn compare(
    State(state): State<AppState>,
    Json(req): Json<PokemonSelection>,
) -> AppResult<Json<CompareResponse>> {
    check_compare_size(req.pokemon_ids.len())?;

    let pokemon = Pokemon::list_by_ids(&state.pool, &req.pokemon_ids).await?;
    let pokemon = Pokemon::with_images(&state.pool, pokemon).await?;

    Ok(Json(CompareResponse { pokemon }))
}

/// Type coverage of a prospective team
pub async fn team_analysis(
    State(state): State<AppState>,
    Json(req): Json<PokemonSelection>,
) -> AppResult<Json<TeamAnalysis>> {
    if req.pokemon_ids.is_empty() {
        return Err(AppError::ValidationError("No Pokemon provided".to_string()));
    }

    let team = Pokemon::list_by_ids(&state.pool, &req.pokemon_ids).await?;
    let type_coverage = type_coverage(&team);
    let team_size = team.len();
    let pokemon = Pokemon::with_images(&state.pool, team).await?;

    Ok(Json(TeamAnalysis {
        type_coverage,
        team_size,
        pokemon,
    }))
}
