//! Pokémon model

use std::collections::HashMap;

use chrono::NaiveDate;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};

use crate::AppResult;
use crate::classifier::fallback::content_hash;

/// Page size for search results
pub const PER_PAGE: i64 = 24;

const ARTWORK_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pokemon {
    pub id: i32,
    pub number: i32,
    pub name: String,

    // Types
    pub main_type: String,
    pub secondary_type: Option<String>,

    // Basic info
    pub region: Option<String>,
    pub category: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub pokemon_family: Option<String>,

    // Combat stats
    pub attack: i32,
    pub defense: i32,
    pub stamina: i32,

    // Game info
    pub cp_range: Option<String>,
    pub hp_range: Option<String>,
    pub capture_rate: Option<String>,
    pub flee_rate: Option<String>,
    pub male_perc: Option<String>,
    pub female_perc: Option<String>,

    // Type effectiveness
    pub resistance: Option<String>,
    pub weakness: Option<String>,

    // Availability
    pub wild_avail: Option<String>,
    pub egg_avail: Option<String>,
    pub raid_avail: Option<String>,
    pub research_avail: Option<String>,
    pub shiny: Option<String>,
    pub shadow: Option<String>,

    pub pokedex_desc: Option<String>,
    pub possible_attacks: Option<String>,
    pub pic_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PokemonImage {
    pub id: i32,
    pub pokemon_id: i32,
    pub filename: String,
    pub path: String,
    pub is_primary: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub id: i32,
    pub filename: String,
    pub path: String,
    pub url: String,
    pub is_primary: bool,
    pub order: i32,
}

/// Full record as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct PokemonDetail {
    #[serde(flatten)]
    pub pokemon: Pokemon,
    /// Alias of stamina
    pub hp: i32,
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub pokemon_type: Option<String>,
    #[serde(rename = "minAttack", default, deserialize_with = "lenient")]
    pub min_attack: Option<i32>,
    #[serde(rename = "minDefense", default, deserialize_with = "lenient")]
    pub min_defense: Option<i32>,
    #[serde(rename = "minStamina", default, deserialize_with = "lenient")]
    pub min_stamina: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<i64>,
}

/// Numeric query parameter; anything unparsable counts as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.trim().parse().ok()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryFilter {
    pub gen: Option<String>,
    #[serde(rename = "type")]
    pub pokemon_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self {
            page,
            total_pages,
            total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Pokédex number range of a generation ("1".."9")
pub fn generation_range(generation: &str) -> Option<(i32, i32)> {
    let range = match generation.trim() {
        "1" => (1, 151),
        "2" => (152, 251),
        "3" => (252, 386),
        "4" => (387, 493),
        "5" => (494, 649),
        "6" => (650, 721),
        "7" => (722, 809),
        "8" => (810, 905),
        "9" => (906, 1025),
        _ => return None,
    };
    Some(range)
}

/// Offset of the Pokémon of the day in number order
pub fn day_offset(date: NaiveDate, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let hash = content_hash(date.format("%Y-%m-%d").to_string().as_bytes());
    (hash % total as u128) as i64
}

/// Map a stored image path to a URL served by this process
pub fn image_url(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    match path.strip_prefix("pokedata/") {
        Some(rest) => format!("/pokedata/{}", rest),
        None => format!("/static/{}", path),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(q) = non_empty(&self.q) {
            qb.push(" AND name ILIKE ").push_bind(format!("%{}%", q.to_lowercase()));
        }
        if let Some(t) = non_empty(&self.pokemon_type) {
            push_type_condition(qb, t);
        }
        // Zero means "no minimum"
        for (column, min) in [
            ("attack", self.min_attack),
            ("defense", self.min_defense),
            ("stamina", self.min_stamina),
        ] {
            if let Some(min) = min.filter(|m| *m != 0) {
                qb.push(format!(" AND {} >= ", column)).push_bind(min);
            }
        }
    }

    /// 1-based page, kept small enough that the row offset fits in an i64
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, i64::MAX / PER_PAGE)
    }
}

fn push_type_condition(qb: &mut QueryBuilder<'_, Postgres>, pokemon_type: &str) {
    let t = pokemon_type.to_lowercase();
    qb.push(" AND (main_type ILIKE ")
        .push_bind(t.clone())
        .push(" OR secondary_type ILIKE ")
        .push_bind(t)
        .push(")");
}

impl Pokemon {
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive exact name match
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon WHERE LOWER(name) = LOWER($1) LIMIT 1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_number(pool: &PgPool, number: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon WHERE number = $1")
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    /// Name first, then Pokédex number
    pub async fn find_by_identifier(pool: &PgPool, identifier: &str) -> Result<Option<Self>, sqlx::Error> {
        if let Some(pokemon) = Self::find_by_name(pool, identifier).await? {
            return Ok(Some(pokemon));
        }
        match identifier.trim().parse::<i32>() {
            Ok(number) => Self::find_by_number(pool, number).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn list_by_ids(pool: &PgPool, ids: &[i32]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon WHERE id = ANY($1) ORDER BY number")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn random(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon ORDER BY RANDOM() LIMIT 1")
            .fetch_optional(pool)
            .await
    }

    pub async fn random_excluding(pool: &PgPool, exclude_id: i32, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon WHERE id <> $1 ORDER BY RANDOM() LIMIT $2")
            .bind(exclude_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pokemon")
            .fetch_one(pool)
            .await
    }

    /// The n-th Pokémon in Pokédex order (0-based)
    pub async fn nth_by_number(pool: &PgPool, offset: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Pokemon>("SELECT * FROM pokemon ORDER BY number OFFSET $1 LIMIT 1")
            .bind(offset)
            .fetch_optional(pool)
            .await
    }

    pub async fn search(pool: &PgPool, filter: &SearchFilter) -> Result<(Vec<Self>, Pagination), sqlx::Error> {
        let page = filter.page();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pokemon");
        filter.push_conditions(&mut count_query);
        let total = count_query.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut page_query = QueryBuilder::<Postgres>::new("SELECT * FROM pokemon");
        filter.push_conditions(&mut page_query);
        page_query
            .push(" ORDER BY number LIMIT ")
            .push_bind(PER_PAGE)
            .push(" OFFSET ")
            .push_bind((page - 1) * PER_PAGE);

        let results = page_query.build_query_as::<Pokemon>().fetch_all(pool).await?;

        Ok((results, Pagination::new(page, PER_PAGE, total)))
    }

    pub async fn gallery(pool: &PgPool, filter: &GalleryFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM pokemon WHERE TRUE");

        if let Some(t) = non_empty(&filter.pokemon_type) {
            push_type_condition(&mut qb, t);
        }
        if let Some((start, end)) = filter.gen.as_deref().and_then(generation_range) {
            qb.push(" AND number >= ").push_bind(start)
                .push(" AND number <= ").push_bind(end);
        }
        qb.push(" ORDER BY number");

        qb.build_query_as::<Pokemon>().fetch_all(pool).await
    }

    pub async fn count_by_main_type(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT main_type, COUNT(*) as count
            FROM pokemon
            GROUP BY main_type
            "#
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| {
            (r.get::<String, _>("main_type"), r.get::<i64, _>("count"))
        }).collect())
    }

    /// Load images and build API records, preserving order
    pub async fn with_images(pool: &PgPool, pokemon: Vec<Self>) -> Result<Vec<PokemonDetail>, sqlx::Error> {
        let ids: Vec<i32> = pokemon.iter().map(|p| p.id).collect();
        let mut images = PokemonImage::list_for_many(pool, &ids).await?;

        Ok(pokemon.into_iter().map(|p| {
            let own = images.remove(&p.id).unwrap_or_default();
            p.into_detail(own)
        }).collect())
    }

    pub async fn detail(self, pool: &PgPool) -> Result<PokemonDetail, sqlx::Error> {
        let images = PokemonImage::list_for(pool, self.id).await?;
        Ok(self.into_detail(images))
    }

    pub fn into_detail(self, images: Vec<PokemonImage>) -> PokemonDetail {
        PokemonDetail {
            hp: self.stamina,
            images: images.iter().map(PokemonImage::to_info).collect(),
            pokemon: self,
        }
    }

    pub fn artwork_url(&self) -> String {
        format!("{}/{}.png", ARTWORK_BASE_URL, self.number)
    }

    /// Plain-text trading card
    pub fn card_text(&self) -> String {
        let types = match &self.secondary_type {
            Some(secondary) if !secondary.is_empty() => format!("{} / {}", self.main_type, secondary),
            _ => self.main_type.clone(),
        };

        format!(
            "Pokemon Card: {} (#{})\nType: {}\nATK: {} | DEF: {} | HP: {}\n{}\n",
            self.name,
            self.number,
            types,
            self.attack,
            self.defense,
            self.stamina,
            self.pokedex_desc.as_deref().unwrap_or(""),
        )
    }
}

impl PokemonImage {
    pub async fn list_for(pool: &PgPool, pokemon_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PokemonImage>(
            "SELECT * FROM pokemon_images WHERE pokemon_id = $1 ORDER BY sort_order, id"
        )
        .bind(pokemon_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_many(pool: &PgPool, pokemon_ids: &[i32]) -> Result<HashMap<i32, Vec<Self>>, sqlx::Error> {
        if pokemon_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PokemonImage>(
            "SELECT * FROM pokemon_images WHERE pokemon_id = ANY($1) ORDER BY sort_order, id"
        )
        .bind(pokemon_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<Self>> = HashMap::new();
        for image in rows {
            grouped.entry(image.pokemon_id).or_default().push(image);
        }
        Ok(grouped)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pokemon_images")
            .fetch_one(pool)
            .await
    }

    pub fn to_info(&self) -> ImageInfo {
        ImageInfo {
            id: self.id,
            filename: self.filename.clone(),
            path: self.path.clone(),
            url: image_url(&self.path),
            is_primary: self.is_primary,
            order: self.sort_order,
        }
    }
}

/// Name lookup used to enrich identification results
#[axum::async_trait]
pub trait PokemonDirectory: Send + Sync {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<PokemonDetail>>;
}

#[axum::async_trait]
impl PokemonDirectory for PgPool {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<PokemonDetail>> {
        match Pokemon::find_by_name(self, name).await? {
            Some(pokemon) => Ok(Some(pokemon.detail(self).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub fn sample(id: i32, number: i32, name: &str, main_type: &str, secondary_type: Option<&str>) -> Pokemon {
    Pokemon {
        id,
        number,
        name: name.to_string(),
        main_type: main_type.to_string(),
        secondary_type: secondary_type.map(str::to_string),
        region: Some("Kanto".to_string()),
        category: None,
        height: None,
        weight: None,
        pokemon_family: None,
        attack: 118,
        defense: 111,
        stamina: 128,
        cp_range: None,
        hp_range: None,
        capture_rate: None,
        flee_rate: None,
        male_perc: None,
        female_perc: None,
        resistance: None,
        weakness: None,
        wild_avail: None,
        egg_avail: None,
        raid_avail: None,
        research_avail: None,
        shiny: None,
        shadow: None,
        pokedex_desc: None,
        possible_attacks: None,
        pic_url: None,
    }
}
