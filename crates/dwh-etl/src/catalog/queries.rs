//! Bulk-load and insert statement text.

use super::literal::quote_literal;
use crate::config::UserConflictPolicy;
use crate::error::Result;

/// Build a `COPY ... FORMAT AS JSON` statement for a staging table.
///
/// `table` must be one of the catalog's own table names; every other
/// argument is configuration and is quoted as a literal.
pub fn copy_json(
    table: &str,
    location: &str,
    role_arn: &str,
    region: &str,
    json_format: &str,
) -> Result<String> {
    Ok(format!(
        "COPY {table}\nFROM {location}\nCREDENTIALS {credentials}\nREGION {region}\nFORMAT AS JSON {format}",
        table = table,
        location = quote_literal(location)?,
        credentials = quote_literal(&format!("aws_iam_role={}", role_arn))?,
        region = quote_literal(region)?,
        format = quote_literal(json_format)?,
    ))
}

// `ts` holds epoch milliseconds; integer division drops the sub-second part.
pub const SONGPLAYS_INSERT: &str = "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT
    TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second' AS start_time,
    se.userId AS user_id,
    se.level,
    ss.song_id,
    ss.artist_id,
    se.sessionId AS session_id,
    se.location,
    se.userAgent AS user_agent
FROM staging_events se
JOIN staging_songs ss
    ON se.artist = ss.artist_name
    AND se.song = ss.title
    AND ABS(se.length - ss.duration) <= 1
WHERE se.page = 'NextSong'
    AND se.artist IS NOT NULL
    AND se.song IS NOT NULL
    AND se.length IS NOT NULL";

pub const USERS_INSERT_ALL_DISTINCT: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT DISTINCT
    se.userId AS user_id,
    se.firstName AS first_name,
    se.lastName AS last_name,
    se.gender,
    se.level
FROM staging_events se
WHERE se.page = 'NextSong'";

pub const USERS_INSERT_LATEST: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT user_id, first_name, last_name, gender, level
FROM (
    SELECT
        se.userId AS user_id,
        se.firstName AS first_name,
        se.lastName AS last_name,
        se.gender,
        se.level,
        ROW_NUMBER() OVER (PARTITION BY se.userId ORDER BY se.ts DESC) AS recency
    FROM staging_events se
    WHERE se.page = 'NextSong'
        AND se.userId IS NOT NULL
) latest
WHERE latest.recency = 1";

pub const SONGS_INSERT: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT DISTINCT
    ss.song_id,
    ss.title,
    ss.artist_id,
    ss.year,
    ss.duration
FROM staging_songs ss";

pub const ARTISTS_INSERT: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT DISTINCT
    ss.artist_id,
    ss.artist_name AS name,
    ss.artist_location AS location,
    ss.artist_latitude AS latitude,
    ss.artist_longitude AS longitude
FROM staging_songs ss";

// DATE_PART(dayofweek) counts from Sunday = 0.
pub const TIME_INSERT: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT
    TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second' AS start_time,
    EXTRACT(hour FROM start_time) AS hour,
    EXTRACT(day FROM start_time) AS day,
    EXTRACT(week FROM start_time) AS week,
    EXTRACT(month FROM start_time) AS month,
    EXTRACT(year FROM start_time) AS year,
    DATE_PART(dayofweek, start_time) AS weekday
FROM staging_events se
WHERE se.page = 'NextSong'";

/// The users insert for a conflict policy.
pub fn users_insert(policy: UserConflictPolicy) -> &'static str {
    match policy {
        UserConflictPolicy::AllDistinct => USERS_INSERT_ALL_DISTINCT,
        UserConflictPolicy::LatestByTimestamp => USERS_INSERT_LATEST,
    }
}
