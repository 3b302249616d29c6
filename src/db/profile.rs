use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::{ProfilePatch, UserProfile};

/// Single-user profile, row id 1. Created empty on first access.
pub async fn get_profile(pool: &SqlitePool) -> Result<UserProfile> {
    sqlx::query("INSERT OR IGNORE INTO profile (id, name, notes) VALUES (1, '', '')")
        .execute(pool)
        .await?;

    let profile = sqlx::query_as::<_, UserProfile>("SELECT id, name, notes FROM profile WHERE id = 1")
        .fetch_one(pool)
        .await?;
    Ok(profile)
}

pub async fn update_profile(pool: &SqlitePool, patch: ProfilePatch) -> Result<UserProfile> {
    let mut profile = get_profile(pool).await?;
    if let Some(name) = patch.name {
        profile.name = name;
    }
    if let Some(notes) = patch.notes {
        profile.notes = notes;
    }

    sqlx::query("UPDATE profile SET name = ?, notes = ? WHERE id = 1")
        .bind(&profile.name)
        .bind(&profile.notes)
        .execute(pool)
        .await?;

    Ok(profile)
}
