//! Table definitions: staging, fact and dimension DDL.

pub const STAGING_EVENTS: &str = "staging_events";
pub const STAGING_SONGS: &str = "staging_songs";
pub const SONGPLAYS: &str = "songplays";
pub const USERS: &str = "users";
pub const SONGS: &str = "songs";
pub const ARTISTS: &str = "artists";
pub const TIME: &str = "time";

/// Role of a table in the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    /// Raw rows bulk-loaded from object storage.
    Staging,
    /// Event occurrences referencing dimensions.
    Fact,
    /// Descriptive entities.
    Dimension,
}

/// A warehouse table and its DDL.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub role: TableRole,
    pub create_sql: &'static str,
}

impl TableDef {
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }
}

/// All tables, in drop/create order.
pub const TABLES: [TableDef; 7] = [
    TableDef {
        name: STAGING_EVENTS,
        role: TableRole::Staging,
        create_sql: STAGING_EVENTS_CREATE,
    },
    TableDef {
        name: STAGING_SONGS,
        role: TableRole::Staging,
        create_sql: STAGING_SONGS_CREATE,
    },
    TableDef {
        name: SONGPLAYS,
        role: TableRole::Fact,
        create_sql: SONGPLAYS_CREATE,
    },
    TableDef {
        name: USERS,
        role: TableRole::Dimension,
        create_sql: USERS_CREATE,
    },
    TableDef {
        name: SONGS,
        role: TableRole::Dimension,
        create_sql: SONGS_CREATE,
    },
    TableDef {
        name: ARTISTS,
        role: TableRole::Dimension,
        create_sql: ARTISTS_CREATE,
    },
    TableDef {
        name: TIME,
        role: TableRole::Dimension,
        create_sql: TIME_CREATE,
    },
];

/// Look up a table definition by name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

// Column names follow the JSON keys of the event log so the JSONPaths file
// (or 'auto') maps them without renaming.
const STAGING_EVENTS_CREATE: &str = "CREATE TABLE IF NOT EXISTS staging_events (
    artist          VARCHAR(500),
    auth            VARCHAR(20),
    firstName       VARCHAR(50),
    gender          VARCHAR(1),
    itemInSession   INTEGER,
    lastName        VARCHAR(50),
    length          DOUBLE PRECISION,
    level           VARCHAR(10),
    location        VARCHAR(250),
    method          VARCHAR(10),
    page            VARCHAR(50),
    registration    DOUBLE PRECISION,
    sessionId       INTEGER,
    song            VARCHAR(500),
    status          INTEGER,
    ts              BIGINT,
    userAgent       VARCHAR(500),
    userId          INTEGER SORTKEY
)";

const STAGING_SONGS_CREATE: &str = "CREATE TABLE IF NOT EXISTS staging_songs (
    num_songs           INTEGER,
    artist_id           VARCHAR(50),
    artist_latitude     DOUBLE PRECISION,
    artist_longitude    DOUBLE PRECISION,
    artist_location     VARCHAR(500),
    artist_name         VARCHAR(500),
    song_id             VARCHAR(50) SORTKEY,
    title               VARCHAR(500),
    duration            DOUBLE PRECISION,
    year                INTEGER
)";

const SONGPLAYS_CREATE: &str = "CREATE TABLE IF NOT EXISTS songplays (
    songplay_id     BIGINT IDENTITY(0,1) PRIMARY KEY SORTKEY,
    start_time      TIMESTAMP NOT NULL,
    user_id         INTEGER NOT NULL DISTKEY,
    level           VARCHAR(10) NOT NULL,
    song_id         VARCHAR(50) NOT NULL,
    artist_id       VARCHAR(50) NOT NULL,
    session_id      INTEGER NOT NULL,
    location        VARCHAR(250),
    user_agent      VARCHAR(500)
)";

const USERS_CREATE: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id         INTEGER NOT NULL PRIMARY KEY SORTKEY,
    first_name      VARCHAR(50) NOT NULL,
    last_name       VARCHAR(50) NOT NULL,
    gender          VARCHAR(1),
    level           VARCHAR(10)
) DISTSTYLE ALL";

const SONGS_CREATE: &str = "CREATE TABLE IF NOT EXISTS songs (
    song_id         VARCHAR(50) NOT NULL PRIMARY KEY SORTKEY,
    title           VARCHAR(500) NOT NULL,
    artist_id       VARCHAR(50) NOT NULL,
    year            INTEGER NOT NULL,
    duration        DOUBLE PRECISION NOT NULL
)";

const ARTISTS_CREATE: &str = "CREATE TABLE IF NOT EXISTS artists (
    artist_id       VARCHAR(50) NOT NULL PRIMARY KEY SORTKEY,
    name            VARCHAR(500) NOT NULL,
    location        VARCHAR(500),
    latitude        DOUBLE PRECISION,
    longitude       DOUBLE PRECISION
) DISTSTYLE ALL";

const TIME_CREATE: &str = "CREATE TABLE IF NOT EXISTS time (
    start_time      TIMESTAMP NOT NULL PRIMARY KEY SORTKEY,
    hour            INTEGER,
    day             INTEGER,
    week            INTEGER,
    month           INTEGER,
    year            INTEGER,
    weekday         INTEGER
) DISTSTYLE ALL";
