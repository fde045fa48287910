//! Database schema and migrations for drive.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users provisioned from identity tokens
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,            -- subject claim of the identity token
    email       TEXT,
    full_name   TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_users_email ON users(email);
"#,
    // v2: Item tree
    r#"
CREATE TABLE items (
    id            TEXT PRIMARY KEY,
    parent_id     TEXT REFERENCES items(id) ON DELETE CASCADE,
    title         TEXT NOT NULL,
    filename      TEXT,                                  -- files only
    type          TEXT NOT NULL CHECK (type IN ('file', 'folder')),
    upload_state  TEXT,                                  -- files only
    size          INTEGER,
    mimetype      TEXT,
    creator_id    TEXT REFERENCES users(id) ON DELETE SET NULL,
    link_reach    TEXT NOT NULL DEFAULT 'restricted',    -- 'restricted', 'authenticated', 'public'
    link_role     TEXT NOT NULL DEFAULT 'reader',        -- 'reader', 'editor'
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (type = 'folder' OR parent_id IS NOT NULL)
);

CREATE INDEX idx_items_parent ON items(parent_id);
CREATE INDEX idx_items_creator ON items(creator_id);
"#,
    // v3: Accesses granted to users or teams
    r#"
CREATE TABLE item_accesses (
    id          TEXT PRIMARY KEY,
    item_id     TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    user_id     TEXT REFERENCES users(id) ON DELETE CASCADE,
    team        TEXT NOT NULL DEFAULT '',
    role        TEXT NOT NULL DEFAULT 'reader',  -- 'reader', 'editor', 'administrator', 'owner'
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((user_id IS NOT NULL AND team = '') OR (user_id IS NULL AND team != ''))
);

CREATE UNIQUE INDEX idx_item_accesses_user ON item_accesses(item_id, user_id)
    WHERE user_id IS NOT NULL;
CREATE UNIQUE INDEX idx_item_accesses_team ON item_accesses(item_id, team)
    WHERE team != '';
CREATE INDEX idx_item_accesses_user_id ON item_accesses(user_id);
"#,
    // v4: Favorites
    r#"
CREATE TABLE item_favorites (
    item_id     TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (item_id, user_id)
);

CREATE INDEX idx_item_favorites_user ON item_favorites(user_id);
"#,
];
