use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::Store;
use super::schema::SCHEMA;
use crate::auth::hash_secret;
use crate::error::{Error, Result};
use crate::types::*;

const REPO_COLUMNS: &str = "r.id, r.name, r.description, r.owner, r.last_modifier, r.last_modified, \
     r.size, r.encrypted, r.origin_repo_id, r.origin_path, r.org_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates the schema, then runs each extra SQL batch on top of it.
    pub fn initialize_with_extensions(&self, extensions: &[&str]) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        for extension in extensions {
            conn.execute_batch(extension)?;
        }
        Ok(())
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }

    fn insert_repo(&self, repo: &Repo, password: Option<&str>) -> Result<()> {
        let magic = password.map(hash_secret).transpose()?;
        self.conn().execute(
            "INSERT INTO repos (id, name, description, owner, last_modifier, last_modified, size,
                                encrypted, magic, origin_repo_id, origin_path, org_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                repo.id,
                repo.name,
                repo.description,
                repo.owner,
                repo.last_modifier,
                repo.last_modified,
                repo.size,
                repo.encrypted,
                magic,
                repo.origin_repo_id,
                repo.origin_path,
                repo.org_id,
            ],
        )?;
        Ok(())
    }

    fn new_repo(
        name: &str,
        description: &str,
        owner: &str,
        password: Option<&str>,
        org_id: Option<i64>,
    ) -> Repo {
        Repo {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            owner: owner.to_string(),
            last_modifier: owner.to_string(),
            last_modified: Utc::now().timestamp(),
            size: 0,
            encrypted: password.is_some(),
            origin_repo_id: None,
            origin_path: None,
            org_id,
        }
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn permission_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<SharePermission> {
    let value: String = row.get(idx)?;
    SharePermission::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(Error::InvalidPermission(value)),
        )
    })
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<Repo> {
    Ok(Repo {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        last_modifier: row.get(4)?,
        last_modified: row.get(5)?,
        size: row.get(6)?,
        encrypted: row.get(7)?,
        origin_repo_id: row.get(8)?,
        origin_path: row.get(9)?,
        org_id: row.get(10)?,
    })
}

fn group_repo_from_row(row: &Row<'_>) -> rusqlite::Result<GroupRepo> {
    Ok(GroupRepo {
        repo: repo_from_row(row)?,
        group_id: row.get(11)?,
        permission: permission_column(row, 12)?,
        shared_by: row.get(13)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        nickname: row.get(1)?,
        contact_email: row.get(2)?,
        role: row.get(3)?,
        org_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        creator: row.get(2)?,
        org_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_email: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.initialize_with_extensions(&[])
    }

    // User directory

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (email, nickname, contact_email, role, org_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.email,
                user.nickname,
                user.contact_email,
                user.role,
                user.org_id,
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT email, nickname, contact_email, role, org_id, created_at
             FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn display_name(&self, email: &str) -> String {
        match self.get_user(email) {
            Ok(Some(user)) => user
                .nickname
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email_local_part(email)),
            Ok(None) => email_local_part(email),
            Err(e) => {
                tracing::warn!("Failed to look up nickname for {email}: {e}");
                email_local_part(email)
            }
        }
    }

    fn contact_email(&self, email: &str) -> String {
        match self.get_user(email) {
            Ok(Some(user)) => user
                .contact_email
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| email.to_string()),
            Ok(None) => email.to_string(),
            Err(e) => {
                tracing::warn!("Failed to look up contact email for {email}: {e}");
                email.to_string()
            }
        }
    }

    // Organization operations

    fn create_org(&self, name: &str) -> Result<Org> {
        let now = Utc::now();
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO orgs (name, created_at) VALUES (?1, ?2)",
            params![name, format_datetime(&now)],
        );

        match result {
            Ok(_) => Ok(Org {
                org_id: conn.last_insert_rowid(),
                name: name.to_string(),
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_org(&self, org_id: i64) -> Result<Option<Org>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT org_id, name, created_at FROM orgs WHERE org_id = ?1",
            params![org_id],
            |row| {
                Ok(Org {
                    org_id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Group operations

    fn create_group(&self, name: &str, creator: &str, org_id: Option<i64>) -> Result<Group> {
        let now = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO groups (name, creator, org_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, creator, org_id, format_datetime(&now)],
        )?;
        let id = tx.last_insert_rowid();

        // The creator administers the group
        tx.execute(
            "INSERT INTO group_members (group_id, email, is_admin, joined_at) VALUES (?1, ?2, 1, ?3)",
            params![id, creator, format_datetime(&now)],
        )?;
        tx.commit()?;

        Ok(Group {
            id,
            name: name.to_string(),
            creator: creator.to_string(),
            org_id,
            created_at: now,
        })
    }

    fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, creator, org_id, created_at FROM groups WHERE id = ?1",
            params![group_id],
            group_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn is_org_group(&self, group_id: i64) -> Result<bool> {
        Ok(self.get_org_id_for_group(group_id)?.is_some())
    }

    fn get_org_id_for_group(&self, group_id: i64) -> Result<Option<i64>> {
        let conn = self.conn();
        let org_id: Option<Option<i64>> = conn
            .query_row(
                "SELECT org_id FROM groups WHERE id = ?1",
                params![group_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(org_id.flatten())
    }

    fn add_group_member(&self, group_id: i64, email: &str, is_admin: bool) -> Result<()> {
        self.conn().execute(
            "INSERT INTO group_members (group_id, email, is_admin, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (group_id, email) DO UPDATE SET is_admin = excluded.is_admin",
            params![group_id, email, is_admin, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn is_group_member(&self, group_id: i64, email: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND email = ?2",
            params![group_id, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_group_admin(&self, group_id: i64, email: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND email = ?2 AND is_admin = 1",
            params![group_id, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Repo operations

    fn create_repo(
        &self,
        name: &str,
        description: &str,
        owner: &str,
        password: Option<&str>,
    ) -> Result<String> {
        let repo = Self::new_repo(name, description, owner, password, None);
        self.insert_repo(&repo, password)?;
        Ok(repo.id)
    }

    fn create_org_repo(
        &self,
        name: &str,
        description: &str,
        owner: &str,
        password: Option<&str>,
        org_id: i64,
    ) -> Result<String> {
        let repo = Self::new_repo(name, description, owner, password, Some(org_id));
        self.insert_repo(&repo, password)?;
        Ok(repo.id)
    }

    fn create_sub_repo(
        &self,
        origin_repo_id: &str,
        path: &str,
        name: &str,
        owner: &str,
    ) -> Result<String> {
        let origin = self.get_repo(origin_repo_id)?.ok_or(Error::NotFound)?;
        if origin.is_virtual() {
            return Err(Error::BadRequest(
                "cannot derive a sub-library from a sub-library".to_string(),
            ));
        }

        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::BadRequest("sub-library path cannot be root".to_string()));
        }

        let mut repo = Self::new_repo(name, "", owner, None, origin.org_id);
        repo.encrypted = origin.encrypted;
        repo.origin_repo_id = Some(origin.id);
        repo.origin_path = Some(format!("/{trimmed}"));
        self.insert_repo(&repo, None)?;
        Ok(repo.id)
    }

    fn get_repo(&self, repo_id: &str) -> Result<Option<Repo>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPO_COLUMNS} FROM repos r WHERE r.id = ?1"),
            params![repo_id],
            repo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_repo_owner(&self, repo_id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT owner FROM repos WHERE id = ?1",
            params![repo_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_repo_stats(
        &self,
        repo_id: &str,
        modifier: &str,
        size: i64,
        last_modified: i64,
    ) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE repos SET last_modifier = ?1, size = ?2, last_modified = ?3 WHERE id = ?4",
            params![modifier, size, last_modified, repo_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_repo(&self, repo_id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repos WHERE id = ?1", params![repo_id])?;
        Ok(rows > 0)
    }

    // Group-repo bindings

    fn list_group_repos(&self, group_id: i64) -> Result<Vec<GroupRepo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPO_COLUMNS}, g.group_id, g.permission, g.shared_by
             FROM group_repos g
             JOIN repos r ON r.id = g.repo_id
             WHERE g.group_id = ?1
             ORDER BY r.name"
        ))?;

        let rows = stmt.query_map(params![group_id], group_repo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_org_group_repos(&self, org_id: i64, group_id: i64) -> Result<Vec<GroupRepo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPO_COLUMNS}, g.group_id, g.permission, g.shared_by
             FROM org_group_repos g
             JOIN repos r ON r.id = g.repo_id
             WHERE g.org_id = ?1 AND g.group_id = ?2
             ORDER BY r.name"
        ))?;

        let rows = stmt.query_map(params![org_id, group_id], group_repo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn bind_group_repo(
        &self,
        repo_id: &str,
        group_id: i64,
        shared_by: &str,
        permission: SharePermission,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO group_repos (repo_id, group_id, shared_by, permission)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (repo_id, group_id) DO UPDATE SET
                shared_by = excluded.shared_by,
                permission = excluded.permission",
            params![repo_id, group_id, shared_by, permission.as_str()],
        )?;
        Ok(())
    }

    fn bind_org_group_repo(
        &self,
        repo_id: &str,
        org_id: i64,
        group_id: i64,
        shared_by: &str,
        permission: SharePermission,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO org_group_repos (org_id, repo_id, group_id, shared_by, permission)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (org_id, repo_id, group_id) DO UPDATE SET
                shared_by = excluded.shared_by,
                permission = excluded.permission",
            params![org_id, repo_id, group_id, shared_by, permission.as_str()],
        )?;
        Ok(())
    }

    fn unbind_group_repo(&self, repo_id: &str, group_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM group_repos WHERE repo_id = ?1 AND group_id = ?2",
            params![repo_id, group_id],
        )?;
        Ok(rows > 0)
    }

    fn unbind_org_group_repo(&self, repo_id: &str, org_id: i64, group_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM org_group_repos WHERE repo_id = ?1 AND org_id = ?2 AND group_id = ?3",
            params![repo_id, org_id, group_id],
        )?;
        Ok(rows > 0)
    }

    // Share policy

    fn set_extra_group_permission(
        &self,
        repo_id: &str,
        group_id: i64,
        permission: SharePermission,
    ) -> Result<()> {
        let conn = self.conn();
        let shared: bool = conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM group_repos WHERE repo_id = ?1 AND group_id = ?2
             ) OR EXISTS (
                 SELECT 1 FROM org_group_repos WHERE repo_id = ?1 AND group_id = ?2
             )",
            params![repo_id, group_id],
            |row| row.get(0),
        )?;
        if !shared {
            return Err(Error::NotFound);
        }

        conn.execute(
            "INSERT INTO extra_groups_share_permissions (repo_id, group_id, permission)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (repo_id, group_id) DO UPDATE SET permission = excluded.permission",
            params![repo_id, group_id, permission.as_str()],
        )?;
        Ok(())
    }

    fn get_extra_group_permission(
        &self,
        repo_id: &str,
        group_id: i64,
    ) -> Result<Option<SharePermission>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT permission FROM extra_groups_share_permissions
             WHERE repo_id = ?1 AND group_id = ?2",
            params![repo_id, group_id],
            |row| permission_column(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_extra_group_permission(&self, repo_id: &str, group_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM extra_groups_share_permissions WHERE repo_id = ?1 AND group_id = ?2",
            params![repo_id, group_id],
        )?;
        Ok(rows > 0)
    }

    fn set_extra_user_permission(
        &self,
        repo_id: &str,
        email: &str,
        permission: SharePermission,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO extra_share_permissions (repo_id, share_to, permission)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (repo_id, share_to) DO UPDATE SET permission = excluded.permission",
            params![repo_id, email, permission.as_str()],
        )?;
        Ok(())
    }

    fn is_repo_admin(&self, email: &str, repo_id: &str) -> Result<bool> {
        let conn = self.conn();
        let is_admin: bool = conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM extra_share_permissions
                 WHERE repo_id = ?1 AND share_to = ?2 AND permission = 'admin'
             ) OR EXISTS (
                 SELECT 1 FROM extra_groups_share_permissions p
                 JOIN group_members m ON m.group_id = p.group_id
                 WHERE p.repo_id = ?1 AND m.email = ?2 AND p.permission = 'admin'
                   AND (EXISTS (
                            SELECT 1 FROM group_repos g
                            WHERE g.repo_id = p.repo_id AND g.group_id = p.group_id
                        ) OR EXISTS (
                            SELECT 1 FROM org_group_repos o
                            WHERE o.repo_id = p.repo_id AND o.group_id = p.group_id
                        ))
             )",
            params![repo_id, email],
            |row| row.get(0),
        )?;
        Ok(is_admin)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_email, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_email,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_email, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Event records

    fn record_perm_audit(&self, audit: &PermAudit) -> Result<()> {
        self.conn().execute(
            "INSERT INTO perm_audits (etype, actor, group_id, repo_id, path, permission, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                audit.etype,
                audit.actor,
                audit.group_id,
                audit.repo_id,
                audit.path,
                audit.permission,
                format_datetime(&audit.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_perm_audits(&self, repo_id: &str) -> Result<Vec<PermAudit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT etype, actor, group_id, repo_id, path, permission, created_at
             FROM perm_audits WHERE repo_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![repo_id], |row| {
            Ok(PermAudit {
                etype: row.get(0)?,
                actor: row.get(1)?,
                group_id: row.get(2)?,
                repo_id: row.get(3)?,
                path: row.get(4)?,
                permission: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn record_repo_created(&self, event: &RepoCreated) -> Result<()> {
        self.conn().execute(
            "INSERT INTO repo_created_events (org_id, creator, repo_id, repo_name, library_template, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.org_id,
                event.creator,
                event.repo_id,
                event.repo_name,
                event.library_template,
                format_datetime(&event.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_repo_created(&self, creator: &str) -> Result<Vec<RepoCreated>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT org_id, creator, repo_id, repo_name, library_template, created_at
             FROM repo_created_events WHERE creator = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![creator], |row| {
            Ok(RepoCreated {
                org_id: row.get(0)?,
                creator: row.get(1)?,
                repo_id: row.get(2)?,
                repo_name: row.get(3)?,
                library_template: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_user(email: &str) -> User {
        User {
            email: email.to_string(),
            nickname: None,
            contact_email: None,
            role: "default".to_string(),
            org_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"orgs".to_string()));
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
        assert!(tables.contains(&"groups".to_string()));
        assert!(tables.contains(&"group_members".to_string()));
        assert!(tables.contains(&"repos".to_string()));
        assert!(tables.contains(&"group_repos".to_string()));
        assert!(tables.contains(&"org_group_repos".to_string()));
        assert!(tables.contains(&"extra_groups_share_permissions".to_string()));
        assert!(tables.contains(&"extra_share_permissions".to_string()));
        assert!(tables.contains(&"perm_audits".to_string()));
        assert!(tables.contains(&"repo_created_events".to_string()));
    }

    #[test]
    fn test_initialize_with_extensions() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store
            .initialize_with_extensions(&["CREATE TABLE IF NOT EXISTS quotas (email TEXT PRIMARY KEY)"])
            .unwrap();

        let count: i32 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='quotas'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_user_directory_fallbacks() {
        let (_temp, store) = test_store();

        let mut alice = test_user("alice@x.com");
        alice.nickname = Some("Alice".to_string());
        alice.contact_email = Some("alice@contact.com".to_string());
        store.create_user(&alice).unwrap();

        assert_eq!(store.display_name("alice@x.com"), "Alice");
        assert_eq!(store.contact_email("alice@x.com"), "alice@contact.com");
        assert_eq!(store.display_name("ghost@x.com"), "ghost");
        assert_eq!(store.contact_email("ghost@x.com"), "ghost@x.com");

        let duplicate = store.create_user(&alice);
        assert!(matches!(duplicate, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_group_membership() {
        let (_temp, store) = test_store();

        let group = store.create_group("team", "alice@x.com", None).unwrap();
        store.add_group_member(group.id, "bob@x.com", false).unwrap();

        assert!(store.is_group_member(group.id, "alice@x.com").unwrap());
        assert!(store.is_group_admin(group.id, "alice@x.com").unwrap());
        assert!(store.is_group_member(group.id, "bob@x.com").unwrap());
        assert!(!store.is_group_admin(group.id, "bob@x.com").unwrap());
        assert!(!store.is_group_member(group.id, "carol@x.com").unwrap());
        assert!(!store.is_org_group(group.id).unwrap());

        store.add_group_member(group.id, "bob@x.com", true).unwrap();
        assert!(store.is_group_admin(group.id, "bob@x.com").unwrap());
    }

    #[test]
    fn test_org_group() {
        let (_temp, store) = test_store();

        let org = store.create_org("acme").unwrap();
        let group = store.create_group("team", "alice@x.com", Some(org.org_id)).unwrap();

        assert!(store.is_org_group(group.id).unwrap());
        assert_eq!(store.get_org_id_for_group(group.id).unwrap(), Some(org.org_id));
        assert_eq!(store.get_org_id_for_group(9999).unwrap(), None);
        assert!(matches!(store.create_org("acme"), Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_repo_crud() {
        let (_temp, store) = test_store();

        let repo_id = store.create_repo("Notes", "", "alice@x.com", None).unwrap();
        let repo = store.get_repo(&repo_id).unwrap().unwrap();
        assert_eq!(repo.name, "Notes");
        assert_eq!(repo.owner, "alice@x.com");
        assert_eq!(repo.last_modifier, "alice@x.com");
        assert!(!repo.encrypted);
        assert!(repo.description.is_none());
        assert_eq!(
            store.get_repo_owner(&repo_id).unwrap().as_deref(),
            Some("alice@x.com")
        );

        store
            .update_repo_stats(&repo_id, "bob@x.com", 2048, 1_700_000_000)
            .unwrap();
        let repo = store.get_repo(&repo_id).unwrap().unwrap();
        assert_eq!(repo.last_modifier, "bob@x.com");
        assert_eq!(repo.size, 2048);
        assert_eq!(repo.last_modified, 1_700_000_000);

        assert!(store.delete_repo(&repo_id).unwrap());
        assert!(store.get_repo(&repo_id).unwrap().is_none());
        assert!(matches!(
            store.update_repo_stats(&repo_id, "bob@x.com", 0, 0),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_encrypted_repo_stores_password_hash() {
        let (_temp, store) = test_store();

        let repo_id = store
            .create_repo("Secret", "", "alice@x.com", Some("hunter2"))
            .unwrap();
        let repo = store.get_repo(&repo_id).unwrap().unwrap();
        assert!(repo.encrypted);

        let magic: String = store
            .connection()
            .query_row(
                "SELECT magic FROM repos WHERE id = ?1",
                params![repo_id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(magic.starts_with("$argon2id$"));
        assert!(!magic.contains("hunter2"));
    }

    #[test]
    fn test_sub_repo_records_origin() {
        let (_temp, store) = test_store();

        let origin_id = store.create_repo("Projects", "", "alice@x.com", None).unwrap();
        let sub_id = store
            .create_sub_repo(&origin_id, "docs/specs/", "specs", "alice@x.com")
            .unwrap();

        let sub = store.get_repo(&sub_id).unwrap().unwrap();
        assert!(sub.is_virtual());
        assert_eq!(sub.origin_repo_id.as_deref(), Some(origin_id.as_str()));
        assert_eq!(sub.origin_path.as_deref(), Some("/docs/specs"));

        assert!(store.create_sub_repo(&origin_id, "/", "root", "alice@x.com").is_err());
        assert!(store.create_sub_repo(&sub_id, "/a", "nested", "alice@x.com").is_err());
        assert!(matches!(
            store.create_sub_repo("missing", "/a", "x", "alice@x.com"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_group_and_org_bindings_are_separate() {
        let (_temp, store) = test_store();

        let org = store.create_org("acme").unwrap();
        let group = store.create_group("team", "alice@x.com", Some(org.org_id)).unwrap();

        let global_id = store.create_repo("Global", "", "alice@x.com", None).unwrap();
        let org_id = store
            .create_org_repo("Org", "", "alice@x.com", None, org.org_id)
            .unwrap();

        store
            .bind_group_repo(&global_id, group.id, "alice@x.com", SharePermission::Read)
            .unwrap();
        store
            .bind_org_group_repo(&org_id, org.org_id, group.id, "alice@x.com", SharePermission::ReadWrite)
            .unwrap();

        let global = store.list_group_repos(group.id).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].repo.id, global_id);
        assert_eq!(global[0].permission, SharePermission::Read);

        let scoped = store.list_org_group_repos(org.org_id, group.id).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].repo.id, org_id);
        assert_eq!(scoped[0].repo.org_id, Some(org.org_id));
        assert_eq!(scoped[0].permission, SharePermission::ReadWrite);

        assert!(store.unbind_org_group_repo(&org_id, org.org_id, group.id).unwrap());
        assert!(!store.unbind_org_group_repo(&org_id, org.org_id, group.id).unwrap());
        assert!(store.unbind_group_repo(&global_id, group.id).unwrap());
        assert!(!store.unbind_group_repo(&global_id, group.id).unwrap());
    }

    #[test]
    fn test_rebinding_updates_permission() {
        let (_temp, store) = test_store();

        let group = store.create_group("team", "alice@x.com", None).unwrap();
        let repo_id = store.create_repo("Notes", "", "alice@x.com", None).unwrap();

        store
            .bind_group_repo(&repo_id, group.id, "alice@x.com", SharePermission::Read)
            .unwrap();
        store
            .bind_group_repo(&repo_id, group.id, "alice@x.com", SharePermission::Admin)
            .unwrap();

        let repos = store.list_group_repos(group.id).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].permission, SharePermission::Admin);
    }

    #[test]
    fn test_delete_extra_group_permission_is_idempotent() {
        let (_temp, store) = test_store();

        let group = store.create_group("team", "alice@x.com", None).unwrap();
        let repo_id = store.create_repo("Notes", "", "alice@x.com", None).unwrap();
        store
            .bind_group_repo(&repo_id, group.id, "alice@x.com", SharePermission::ReadWrite)
            .unwrap();

        store
            .set_extra_group_permission(&repo_id, group.id, SharePermission::Admin)
            .unwrap();
        assert_eq!(
            store.get_extra_group_permission(&repo_id, group.id).unwrap(),
            Some(SharePermission::Admin)
        );

        assert!(store.delete_extra_group_permission(&repo_id, group.id).unwrap());
        assert!(!store.delete_extra_group_permission(&repo_id, group.id).unwrap());
        assert!(store.get_extra_group_permission(&repo_id, group.id).unwrap().is_none());
    }

    #[test]
    fn test_extra_group_permission_requires_share() {
        let (_temp, store) = test_store();

        let org = store.create_org("acme").unwrap();
        let group = store.create_group("team", "alice@x.com", Some(org.org_id)).unwrap();
        let repo_id = store
            .create_org_repo("Notes", "", "alice@x.com", None, org.org_id)
            .unwrap();

        let result = store.set_extra_group_permission(&repo_id, group.id, SharePermission::Admin);
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(store.get_extra_group_permission(&repo_id, group.id).unwrap().is_none());

        store
            .bind_org_group_repo(&repo_id, org.org_id, group.id, "alice@x.com", SharePermission::Read)
            .unwrap();
        store
            .set_extra_group_permission(&repo_id, group.id, SharePermission::Admin)
            .unwrap();
        assert!(store.is_repo_admin("alice@x.com", &repo_id).unwrap());
    }

    #[test]
    fn test_deleting_repo_removes_extra_permissions() {
        let (_temp, store) = test_store();

        let group = store.create_group("team", "alice@x.com", None).unwrap();
        let origin_id = store.create_repo("Projects", "", "alice@x.com", None).unwrap();
        let sub_id = store
            .create_sub_repo(&origin_id, "/docs", "docs", "alice@x.com")
            .unwrap();
        for repo_id in [&origin_id, &sub_id] {
            store
                .bind_group_repo(repo_id, group.id, "alice@x.com", SharePermission::ReadWrite)
                .unwrap();
            store
                .set_extra_group_permission(repo_id, group.id, SharePermission::Admin)
                .unwrap();
            store
                .set_extra_user_permission(repo_id, "bob@x.com", SharePermission::Admin)
                .unwrap();
        }

        assert!(store.delete_repo(&origin_id).unwrap());

        let conn = store.connection();
        let group_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM extra_groups_share_permissions", [], |row| {
                row.get(0)
            })
            .unwrap();
        let user_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM extra_share_permissions", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(group_rows, 0);
        assert_eq!(user_rows, 0);
    }

    #[test]
    fn test_deleting_org_removes_group_permissions() {
        let (_temp, store) = test_store();

        let org = store.create_org("acme").unwrap();
        let group = store.create_group("team", "alice@x.com", Some(org.org_id)).unwrap();
        let repo_id = store.create_repo("Global", "", "alice@x.com", None).unwrap();
        store
            .bind_group_repo(&repo_id, group.id, "alice@x.com", SharePermission::ReadWrite)
            .unwrap();
        store
            .set_extra_group_permission(&repo_id, group.id, SharePermission::Admin)
            .unwrap();

        store
            .connection()
            .execute("DELETE FROM orgs WHERE org_id = ?1", params![org.org_id])
            .unwrap();

        assert!(store.get_group(group.id).unwrap().is_none());
        assert!(store.get_repo(&repo_id).unwrap().is_some());
        assert!(store.get_extra_group_permission(&repo_id, group.id).unwrap().is_none());
    }

    #[test]
    fn test_is_repo_admin() {
        let (_temp, store) = test_store();

        let repo_id = store.create_repo("Notes", "", "alice@x.com", None).unwrap();
        let group = store.create_group("admins", "carol@x.com", None).unwrap();
        store.add_group_member(group.id, "dave@x.com", false).unwrap();
        store
            .bind_group_repo(&repo_id, group.id, "alice@x.com", SharePermission::ReadWrite)
            .unwrap();

        assert!(!store.is_repo_admin("bob@x.com", &repo_id).unwrap());

        store
            .set_extra_user_permission(&repo_id, "bob@x.com", SharePermission::Admin)
            .unwrap();
        assert!(store.is_repo_admin("bob@x.com", &repo_id).unwrap());

        store
            .set_extra_group_permission(&repo_id, group.id, SharePermission::ReadWrite)
            .unwrap();
        assert!(!store.is_repo_admin("dave@x.com", &repo_id).unwrap());

        store
            .set_extra_group_permission(&repo_id, group.id, SharePermission::Admin)
            .unwrap();
        assert!(store.is_repo_admin("dave@x.com", &repo_id).unwrap());
        assert!(!store.is_repo_admin("eve@x.com", &repo_id).unwrap());

        // A grant left behind after unsharing is ignored
        assert!(store.unbind_group_repo(&repo_id, group.id).unwrap());
        assert_eq!(
            store.get_extra_group_permission(&repo_id, group.id).unwrap(),
            Some(SharePermission::Admin)
        );
        assert!(!store.is_repo_admin("dave@x.com", &repo_id).unwrap());
        assert!(store.is_repo_admin("bob@x.com", &repo_id).unwrap());
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("alice@x.com")).unwrap();

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup12".to_string(),
            user_email: "alice@x.com".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup12".to_string(), // Same lookup
            user_email: "alice@x.com".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));

        let fetched = store.get_token_by_lookup("lookup12").unwrap().unwrap();
        assert_eq!(fetched.id, "token-1");
        assert!(fetched.last_used_at.is_none());

        store.update_token_last_used("token-1").unwrap();
        let fetched = store.get_token_by_lookup("lookup12").unwrap().unwrap();
        assert!(fetched.last_used_at.is_some());

        assert!(store.delete_token("token-1").unwrap());
        assert!(store.get_token_by_lookup("lookup12").unwrap().is_none());
    }

    #[test]
    fn test_event_records() {
        let (_temp, store) = test_store();

        let audit = PermAudit {
            etype: "delete-repo-perm".to_string(),
            actor: "alice@x.com".to_string(),
            group_id: 42,
            repo_id: "repo-1".to_string(),
            path: "/".to_string(),
            permission: String::new(),
            created_at: Utc::now(),
        };
        store.record_perm_audit(&audit).unwrap();

        let audits = store.list_perm_audits("repo-1").unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].etype, "delete-repo-perm");
        assert_eq!(audits[0].group_id, 42);

        let created = RepoCreated {
            org_id: -1,
            creator: "alice@x.com".to_string(),
            repo_id: "repo-1".to_string(),
            repo_name: "Notes".to_string(),
            library_template: String::new(),
            created_at: Utc::now(),
        };
        store.record_repo_created(&created).unwrap();

        let events = store.list_repo_created("alice@x.com").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].org_id, -1);
        assert!(store.list_repo_created("bob@x.com").unwrap().is_empty());
    }
}
