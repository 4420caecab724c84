//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Multi-statement script, so no prepared statement
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Pokémon (imported from the Pokédex CSV)
CREATE TABLE IF NOT EXISTS pokemon (
    id SERIAL PRIMARY KEY,
    number INT NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL UNIQUE,
    main_type VARCHAR(50) NOT NULL,
    secondary_type VARCHAR(50),
    region VARCHAR(50) DEFAULT 'Kanto',
    category VARCHAR(100),
    height VARCHAR(20),
    weight VARCHAR(20),
    pokemon_family VARCHAR(100),
    attack INT NOT NULL DEFAULT 0,
    defense INT NOT NULL DEFAULT 0,
    stamina INT NOT NULL DEFAULT 0,
    cp_range VARCHAR(50),
    hp_range VARCHAR(50),
    capture_rate VARCHAR(10),
    flee_rate VARCHAR(10),
    male_perc VARCHAR(10),
    female_perc VARCHAR(10),
    resistance TEXT,
    weakness TEXT,
    wild_avail VARCHAR(100),
    egg_avail VARCHAR(100),
    raid_avail VARCHAR(100),
    research_avail VARCHAR(100),
    shiny VARCHAR(10),
    shadow VARCHAR(10),
    pokedex_desc TEXT,
    possible_attacks TEXT,
    pic_url VARCHAR(500)
);

-- Local images for the detail carousel
CREATE TABLE IF NOT EXISTS pokemon_images (
    id SERIAL PRIMARY KEY,
    pokemon_id INT NOT NULL REFERENCES pokemon(id) ON DELETE CASCADE,
    filename VARCHAR(255) NOT NULL,
    path VARCHAR(500) NOT NULL,
    is_primary BOOLEAN NOT NULL DEFAULT false,
    sort_order INT NOT NULL DEFAULT 0
);

-- Quiz results
CREATE TABLE IF NOT EXISTS quiz_scores (
    id UUID PRIMARY KEY,
    nickname VARCHAR(50),
    score INT NOT NULL,
    total_questions INT NOT NULL CHECK (total_questions > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_pokemon_name_lower ON pokemon(LOWER(name));
CREATE INDEX IF NOT EXISTS idx_pokemon_main_type ON pokemon(main_type);
CREATE INDEX IF NOT EXISTS idx_pokemon_images_pokemon ON pokemon_images(pokemon_id, sort_order);
CREATE INDEX IF NOT EXISTS idx_quiz_scores_created ON quiz_scores(created_at);
"#;
