//! SQL schema for the CRM SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    emails          TEXT NOT NULL DEFAULT '[]',   -- JSON [{value, label}]
    contact_numbers TEXT NOT NULL DEFAULT '[]',   -- JSON [{value, label}]
    job_title       TEXT,
    organization_id INTEGER,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lead_pipelines (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    is_default  INTEGER NOT NULL DEFAULT 0,
    rotten_days INTEGER NOT NULL DEFAULT 30,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lead_pipeline_stages (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_pipeline_id INTEGER NOT NULL REFERENCES lead_pipelines(id) ON DELETE CASCADE,
    code             TEXT NOT NULL,
    name             TEXT NOT NULL,
    probability      INTEGER NOT NULL DEFAULT 0,
    sort_order       INTEGER NOT NULL DEFAULT 0
);

-- No ON DELETE action: a pipeline or stage cannot be removed while leads
-- still point at it.
CREATE TABLE IF NOT EXISTS leads (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    title                  TEXT NOT NULL,
    description            TEXT,
    lead_value             REAL,
    person_id              INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    lead_pipeline_id       INTEGER NOT NULL REFERENCES lead_pipelines(id),
    lead_pipeline_stage_id INTEGER NOT NULL REFERENCES lead_pipeline_stages(id),
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    color      TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lead_tags (
    lead_id INTEGER NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
    tag_id  INTEGER NOT NULL REFERENCES tags(id)  ON DELETE CASCADE,
    PRIMARY KEY (lead_id, tag_id)
);

-- unique_id / message_id are second-resolution timestamps and may repeat.
CREATE TABLE IF NOT EXISTS emails (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    subject       TEXT,
    source        TEXT NOT NULL,
    user_type     TEXT NOT NULL,
    name          TEXT,
    reply         TEXT NOT NULL,
    is_read       INTEGER NOT NULL DEFAULT 0,
    folders       TEXT NOT NULL,                -- JSON [\"draft\" | \"outbox\" | ...]
    from_address  TEXT NOT NULL,
    reply_to      TEXT NOT NULL DEFAULT '[]',
    cc            TEXT NOT NULL DEFAULT '[]',
    bcc           TEXT NOT NULL DEFAULT '[]',
    unique_id     TEXT NOT NULL,
    message_id    TEXT NOT NULL,
    reference_ids TEXT NOT NULL DEFAULT '[]',
    person_id     INTEGER REFERENCES persons(id) ON DELETE SET NULL,
    lead_id       INTEGER REFERENCES leads(id)   ON DELETE SET NULL,
    parent_id     INTEGER REFERENCES emails(id)  ON DELETE CASCADE,
    user_id       INTEGER,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS email_attachments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    email_id     INTEGER NOT NULL REFERENCES emails(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    path         TEXT NOT NULL,
    size         INTEGER,
    content_type TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS email_templates (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    subject    TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflows (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    description    TEXT,
    entity_type    TEXT NOT NULL,
    event          TEXT NOT NULL,
    condition_type TEXT NOT NULL DEFAULT 'and',
    conditions     TEXT NOT NULL DEFAULT '[]',
    actions        TEXT NOT NULL DEFAULT '[]',
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS persons_name_idx       ON persons(name);
CREATE INDEX IF NOT EXISTS leads_pipeline_idx     ON leads(lead_pipeline_id);
CREATE INDEX IF NOT EXISTS leads_stage_idx        ON leads(lead_pipeline_stage_id);
CREATE INDEX IF NOT EXISTS stages_pipeline_idx    ON lead_pipeline_stages(lead_pipeline_id);
CREATE INDEX IF NOT EXISTS attachments_email_idx  ON email_attachments(email_id);

PRAGMA user_version = 1;
";

/// Stages of the pipeline seeded into an empty store:
/// `(code, name, probability)` in order.
pub const DEFAULT_STAGES: &[(&str, &str, u8)] = &[
  ("new", "New", 100),
  ("follow-up", "Follow Up", 100),
  ("prospect", "Prospect", 100),
  ("negotiation", "Negotiation", 100),
  ("won", "Won", 100),
  ("lost", "Lost", 0),
];

pub const DEFAULT_PIPELINE_NAME: &str = "Default Pipeline";
