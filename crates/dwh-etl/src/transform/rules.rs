//! Transformation rules evaluated over in-memory staging records.
//!
//! These mirror the insert statements in the catalog: the same filters,
//! join conditions and time decomposition, with set-distinct output.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

use super::records::{StagingEvent, StagingSong};
use crate::config::UserConflictPolicy;

/// Page value of a song play event.
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// Maximum difference in seconds between an event's length and a song's duration.
pub const DURATION_TOLERANCE_SECS: f64 = 1.0;

/// Whether the event is a song play.
pub fn is_song_play(event: &StagingEvent) -> bool {
    event.page.as_deref() == Some(SONG_PLAY_PAGE)
}

/// Whether an event refers to a song: same artist, same title and a
/// duration within [`DURATION_TOLERANCE_SECS`].
pub fn matches_song(event: &StagingEvent, song: &StagingSong) -> bool {
    let (Some(artist), Some(title), Some(length)) = (&event.artist, &event.song, event.length)
    else {
        return false;
    };
    song.artist_name.as_deref() == Some(artist.as_str())
        && song.title.as_deref() == Some(title.as_str())
        && song
            .duration
            .is_some_and(|duration| (length - duration).abs() <= DURATION_TOLERANCE_SECS)
}

/// Calendar decomposition of an event timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeParts {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    /// ISO week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 0 = Sunday.
    pub weekday: u32,
}

impl TimeParts {
    /// Decompose epoch milliseconds (UTC). Sub-second precision is dropped.
    /// Returns None when the timestamp is out of range.
    pub fn from_epoch_millis(ts: i64) -> Option<Self> {
        let start_time = DateTime::from_timestamp(ts / 1000, 0)?.naive_utc();
        Some(Self {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().num_days_from_sunday(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SongplayRow {
    pub start_time: NaiveDateTime,
    pub user_id: Option<i64>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UserRow {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRow {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistRow {
    pub artist_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Keep the first occurrence of each key, preserving input order.
fn distinct_by<T, K: Ord>(rows: impl IntoIterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut seen = BTreeSet::new();
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

fn float_key(value: Option<f64>) -> Option<u64> {
    value.map(f64::to_bits)
}

/// Songplay facts: song play events joined to matching songs.
pub fn derive_songplays(events: &[StagingEvent], songs: &[StagingSong]) -> Vec<SongplayRow> {
    let rows = events
        .iter()
        .filter(|e| is_song_play(e))
        .flat_map(|event| {
            songs
                .iter()
                .filter(move |song| matches_song(event, song))
                .filter_map(move |song| {
                    let parts = TimeParts::from_epoch_millis(event.ts)?;
                    Some(SongplayRow {
                        start_time: parts.start_time,
                        user_id: event.user_id,
                        level: event.level.clone(),
                        song_id: song.song_id.clone(),
                        artist_id: song.artist_id.clone(),
                        session_id: event.session_id,
                        location: event.location.clone(),
                        user_agent: event.user_agent.clone(),
                    })
                })
        });
    distinct_by(rows, Clone::clone)
}

/// User rows from song play events under a conflict policy.
pub fn derive_users(events: &[StagingEvent], policy: UserConflictPolicy) -> Vec<UserRow> {
    let plays = events.iter().filter(|e| is_song_play(e));
    match policy {
        UserConflictPolicy::AllDistinct => distinct_by(plays.map(user_row), Clone::clone),
        UserConflictPolicy::LatestByTimestamp => {
            let mut latest: BTreeMap<i64, &StagingEvent> = BTreeMap::new();
            for event in plays {
                let Some(user_id) = event.user_id else {
                    continue;
                };
                latest
                    .entry(user_id)
                    .and_modify(|current| {
                        if event.ts > current.ts {
                            *current = event;
                        }
                    })
                    .or_insert(event);
            }
            latest.into_values().map(user_row).collect()
        }
    }
}

fn user_row(event: &StagingEvent) -> UserRow {
    UserRow {
        user_id: event.user_id,
        first_name: event.first_name.clone(),
        last_name: event.last_name.clone(),
        gender: event.gender.clone(),
        level: event.level.clone(),
    }
}

pub fn derive_songs(songs: &[StagingSong]) -> Vec<SongRow> {
    let rows = songs.iter().map(|s| SongRow {
        song_id: s.song_id.clone(),
        title: s.title.clone(),
        artist_id: s.artist_id.clone(),
        year: s.year,
        duration: s.duration,
    });
    distinct_by(rows, |r| {
        (
            r.song_id.clone(),
            r.title.clone(),
            r.artist_id.clone(),
            r.year,
            float_key(r.duration),
        )
    })
}

pub fn derive_artists(songs: &[StagingSong]) -> Vec<ArtistRow> {
    let rows = songs.iter().map(|s| ArtistRow {
        artist_id: s.artist_id.clone(),
        name: s.artist_name.clone(),
        location: s.artist_location.clone(),
        latitude: s.artist_latitude,
        longitude: s.artist_longitude,
    });
    distinct_by(rows, |r| {
        (
            r.artist_id.clone(),
            r.name.clone(),
            r.location.clone(),
            float_key(r.latitude),
            float_key(r.longitude),
        )
    })
}

/// Time rows for every song play event.
pub fn derive_time(events: &[StagingEvent]) -> Vec<TimeParts> {
    let rows = events
        .iter()
        .filter(|e| is_song_play(e))
        .filter_map(|e| TimeParts::from_epoch_millis(e.ts));
    distinct_by(rows, |parts| *parts)
}
