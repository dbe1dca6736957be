//! SQLite schema for the relational store
//!
//! Applied idempotently at startup. Video and channel rows are owned by an
//! external system; their tables exist here so local and test deployments are
//! self-contained.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS report (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id            INTEGER NOT NULL,
    title               TEXT,
    view                INTEGER,
    view_topic_avg      REAL,
    view_channel_avg    REAL,
    like_count          INTEGER,
    like_topic_avg      REAL,
    like_channel_avg    REAL,
    comment             INTEGER,
    comment_topic_avg   REAL,
    comment_channel_avg REAL,
    concept             REAL,
    seo                 REAL,
    revisit             REAL,
    summary             TEXT,
    positive_comment    INTEGER,
    negative_comment    INTEGER,
    neutral_comment     INTEGER,
    advice_comment      INTEGER,
    leave_analyze       TEXT,
    optimization        TEXT,
    created_at          INTEGER NOT NULL,
    updated_at          INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id       INTEGER NOT NULL REFERENCES report(id),
    overview_status TEXT NOT NULL DEFAULT 'PENDING',
    analysis_status TEXT NOT NULL DEFAULT 'PENDING',
    idea_status     TEXT NOT NULL DEFAULT 'PENDING'
);

CREATE INDEX IF NOT EXISTS idx_task_report ON task(report_id);

CREATE TABLE IF NOT EXISTS video (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id       INTEGER NOT NULL,
    youtube_video_id TEXT NOT NULL,
    video_category   INTEGER NOT NULL,
    title            TEXT,
    description      TEXT,
    view             INTEGER,
    like_count       INTEGER,
    comment_count    INTEGER
);

CREATE INDEX IF NOT EXISTS idx_video_channel ON video(channel_id);
CREATE INDEX IF NOT EXISTS idx_video_category ON video(video_category);

CREATE TABLE IF NOT EXISTS channel (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    youtube_channel_id TEXT NOT NULL,
    name               TEXT NOT NULL,
    concept            TEXT,
    target             TEXT,
    channel_hash_tag   TEXT
);

CREATE TABLE IF NOT EXISTS comment (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id    INTEGER NOT NULL REFERENCES report(id),
    content      TEXT NOT NULL,
    comment_type TEXT NOT NULL,
    like_count   INTEGER NOT NULL DEFAULT 0,
    created_at   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comment_report ON comment(report_id);

CREATE TABLE IF NOT EXISTS idea (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id       INTEGER NOT NULL,
    title          TEXT NOT NULL,
    content        TEXT NOT NULL,
    hash_tag       TEXT NOT NULL,
    is_book_marked INTEGER NOT NULL DEFAULT 0,
    created_at     INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_idea_video ON idea(video_id);

CREATE TABLE IF NOT EXISTS trend_keyword (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id    INTEGER NOT NULL REFERENCES report(id),
    keyword_type TEXT NOT NULL,
    keyword      TEXT NOT NULL,
    score        INTEGER NOT NULL,
    created_at   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trend_keyword_report ON trend_keyword(report_id);
"#;
