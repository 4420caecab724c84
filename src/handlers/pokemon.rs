//! Pokémon browsing handlers

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::{AppState, AppResult, AppError};
use crate::models::{
    day_offset, type_data, GalleryFilter, ImageInfo, Pagination, Pokemon, PokemonDetail,
    PokemonImage, SearchFilter, TypeStyle,
};

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<PokemonDetail>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_pokemon: i64,
    pub total_images: i64,
    pub types_distribution: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct CardData {
    pub pokemon: PokemonDetail,
    pub primary_image: Option<String>,
    pub image_url: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Pokémon not found".to_string())
}

/// Get Pokémon by name or Pokédex number
pub async fn get(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<PokemonDetail>> {
    let pokemon = Pokemon::find_by_identifier(&state.pool, &identifier)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(pokemon.detail(&state.pool).await?))
}

/// Images of a Pokémon
pub async fn images(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ImageInfo>>> {
    let images = PokemonImage::list_for(&state.pool, id).await?;
    Ok(Json(images.iter().map(PokemonImage::to_info).collect()))
}

/// Search with name/type/stat filters
pub async fn search(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> AppResult<Json<SearchResponse>> {
    let (results, pagination) = Pokemon::search(&state.pool, &filter).await?;
    let results = Pokemon::with_images(&state.pool, results).await?;

    Ok(Json(SearchResponse { results, pagination }))
}

/// All types with display colors
pub async fn types() -> Json<BTreeMap<&'static str, TypeStyle>> {
    Json(type_data())
}

pub async fn random(State(state): State<AppState>) -> AppResult<Json<PokemonDetail>> {
    let pokemon = Pokemon::random(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No Pokémon found".to_string()))?;

    Ok(Json(pokemon.detail(&state.pool).await?))
}

/// Database statistics
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let total_pokemon = Pokemon::count(&state.pool).await?;
    let total_images = PokemonImage::count(&state.pool).await?;
    let types_distribution = Pokemon::count_by_main_type(&state.pool)
        .await?
        .into_iter()
        .collect();

    Ok(Json(StatsResponse {
        total_pokemon,
        total_images,
        types_distribution,
    }))
}

/// Same Pokémon for everyone on a given day
pub async fn of_the_day(State(state): State<AppState>) -> AppResult<Json<PokemonDetail>> {
    let total = Pokemon::count(&state.pool).await?;
    if total == 0 {
        return Err(AppError::NotFound("No Pokemon available".to_string()));
    }

    let offset = day_offset(chrono::Local::now().date_naive(), total);
    let pokemon = Pokemon::nth_by_number(&state.pool, offset)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(pokemon.detail(&state.pool).await?))
}

/// Gallery listing filtered by generation and type
pub async fn gallery(
    State(state): State<AppState>,
    Query(filter): Query<GalleryFilter>,
) -> AppResult<Json<Vec<PokemonDetail>>> {
    let pokemon = Pokemon::gallery(&state.pool, &filter).await?;
    Ok(Json(Pokemon::with_images(&state.pool, pokemon).await?))
}

/// Data for client-side card rendering
pub async fn card_data(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<CardData>> {
    let pokemon = Pokemon::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    let image_url = pokemon.artwork_url();
    let pokemon = pokemon.detail(&state.pool).await?;
    let primary_image = pokemon.images.first().map(|img| img.path.clone());

    Ok(Json(CardData {
        pokemon,
        primary_image,
        image_url,
    }))
}

/// Plain-text card as a download
pub async fn download_card(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let pokemon = Pokemon::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    // Header value must stay plain ASCII
    let safe_name: String = pokemon.name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let disposition = format!("attachment; filename={}_card.txt", safe_name);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pokemon.card_text(),
    ))
}
