pub const SCHEMA: &str = r#"
-- Organizations (multi-tenant scope)
CREATE TABLE IF NOT EXISTS orgs (
    org_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- User directory; the email is the user identifier everywhere
CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    nickname TEXT,
    contact_email TEXT,
    role TEXT NOT NULL DEFAULT 'default',
    org_id INTEGER REFERENCES orgs(org_id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials bound to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of a UUID for fast lookup
    user_email TEXT NOT NULL REFERENCES users(email) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Groups; org_id is fixed at creation
CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    creator TEXT NOT NULL,
    org_id INTEGER REFERENCES orgs(org_id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    joined_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (group_id, email)
);

-- Libraries (metadata only; contents live in the block store)
CREATE TABLE IF NOT EXISTS repos (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    owner TEXT NOT NULL,
    last_modifier TEXT NOT NULL,
    last_modified INTEGER NOT NULL,    -- unix seconds
    size INTEGER NOT NULL DEFAULT 0,
    encrypted INTEGER NOT NULL DEFAULT 0,
    magic TEXT,                        -- argon2id hash of the library password

    -- Sub-libraries point at the library and folder they were derived from
    origin_repo_id TEXT REFERENCES repos(id) ON DELETE CASCADE,
    origin_path TEXT,

    org_id INTEGER REFERENCES orgs(org_id) ON DELETE CASCADE
);

-- Library shared to a group
CREATE TABLE IF NOT EXISTS group_repos (
    repo_id TEXT NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    shared_by TEXT NOT NULL,
    permission TEXT NOT NULL,
    PRIMARY KEY (repo_id, group_id)
);

-- Library shared to a group inside an organization
CREATE TABLE IF NOT EXISTS org_group_repos (
    org_id INTEGER NOT NULL REFERENCES orgs(org_id) ON DELETE CASCADE,
    repo_id TEXT NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    shared_by TEXT NOT NULL,
    permission TEXT NOT NULL,
    PRIMARY KEY (org_id, repo_id, group_id)
);

-- Refined permission for a (library, group) share
CREATE TABLE IF NOT EXISTS extra_groups_share_permissions (
    repo_id TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    permission TEXT NOT NULL,
    PRIMARY KEY (repo_id, group_id)
);

-- Refined permission for a (library, user) share
CREATE TABLE IF NOT EXISTS extra_share_permissions (
    repo_id TEXT NOT NULL,
    share_to TEXT NOT NULL,
    permission TEXT NOT NULL,
    PRIMARY KEY (repo_id, share_to)
);

-- Permission audit log
CREATE TABLE IF NOT EXISTS perm_audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    etype TEXT NOT NULL,
    actor TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    repo_id TEXT NOT NULL,
    path TEXT NOT NULL,
    permission TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Library creation activity
CREATE TABLE IF NOT EXISTS repo_created_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id INTEGER NOT NULL,
    creator TEXT NOT NULL,
    repo_id TEXT NOT NULL,
    repo_name TEXT NOT NULL,
    library_template TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Refined permissions go away with the library or group they refer to
CREATE TRIGGER IF NOT EXISTS trg_repos_delete_permissions AFTER DELETE ON repos
BEGIN
    DELETE FROM extra_groups_share_permissions WHERE repo_id = OLD.id;
    DELETE FROM extra_share_permissions WHERE repo_id = OLD.id;
END;

CREATE TRIGGER IF NOT EXISTS trg_groups_delete_permissions AFTER DELETE ON groups
BEGIN
    DELETE FROM extra_groups_share_permissions WHERE group_id = OLD.id;
END;

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_email);
CREATE INDEX IF NOT EXISTS idx_users_org ON users(org_id);
CREATE INDEX IF NOT EXISTS idx_groups_org ON groups(org_id);
CREATE INDEX IF NOT EXISTS idx_group_members_email ON group_members(email);
CREATE INDEX IF NOT EXISTS idx_repos_owner ON repos(owner);
CREATE INDEX IF NOT EXISTS idx_repos_origin ON repos(origin_repo_id);
CREATE INDEX IF NOT EXISTS idx_group_repos_group ON group_repos(group_id);
CREATE INDEX IF NOT EXISTS idx_org_group_repos_group ON org_group_repos(org_id, group_id);
CREATE INDEX IF NOT EXISTS idx_extra_groups_share_repo ON extra_groups_share_permissions(repo_id);
CREATE INDEX IF NOT EXISTS idx_perm_audits_repo ON perm_audits(repo_id);
CREATE INDEX IF NOT EXISTS idx_repo_created_events_creator ON repo_created_events(creator);
"#;
