use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};

/// Pipeline state of a lead. Transitions within one pass are
/// pending → in_progress → {ready | error}; `error` leads are left for a
/// later run, never retried by the pass that marked them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    InProgress,
    Ready,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Ready => "ready",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "pending" => Some(Status::Pending),
            "in_progress" => Some(Status::InProgress),
            "ready" => Some(Status::Ready),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lead {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub neighborhood: Option<String>,
    pub host_name: Option<String>,
    pub price_per_night: Option<i64>,
    pub luxury_score: Option<f64>,
    pub badges: Vec<String>,
    pub maintenance_items: Vec<String>,
    pub cleanliness_gap: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub website: Option<String>,
    pub host_portfolio_size: i64,
    pub description: Option<String>,
    pub status: Status,
    pub pitch: Option<String>,
}

/// Field-level merge input for `upsert`. `None` leaves the stored value
/// untouched; `Some` overwrites it.
#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub title: Option<String>,
    pub neighborhood: Option<String>,
    pub host_name: Option<String>,
    pub price_per_night: Option<i64>,
    pub luxury_score: Option<f64>,
    pub badges: Option<Vec<String>>,
    pub maintenance_items: Option<Vec<String>>,
    pub cleanliness_gap: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub website: Option<String>,
    pub host_portfolio_size: Option<i64>,
    pub description: Option<String>,
}

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS leads (
            id                  INTEGER PRIMARY KEY,
            url                 TEXT UNIQUE NOT NULL,
            title               TEXT,
            neighborhood        TEXT,
            host_name           TEXT,
            price_per_night     INTEGER,
            luxury_score        REAL,
            badges              TEXT,
            maintenance_items   TEXT,
            cleanliness_gap     TEXT,
            email               TEXT,
            phone               TEXT,
            instagram           TEXT,
            website             TEXT,
            host_portfolio_size INTEGER NOT NULL DEFAULT 1,
            description         TEXT,
            status              TEXT NOT NULL DEFAULT 'pending'
                                CHECK(status IN ('pending','in_progress','ready','error')),
            pitch               TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status);
        CREATE INDEX IF NOT EXISTS idx_leads_score ON leads(luxury_score);
        ",
    )?;
    Ok(())
}

fn to_json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

const LEAD_COLUMNS: &str = "id, url, title, neighborhood, host_name, price_per_night, \
     luxury_score, badges, maintenance_items, cleanliness_gap, email, phone, \
     instagram, website, host_portfolio_size, description, status, pitch";

fn lead_from_row(row: &Row) -> rusqlite::Result<Lead> {
    let badges: Option<String> = row.get(7)?;
    let maintenance: Option<String> = row.get(8)?;
    let status: String = row.get(16)?;
    Ok(Lead {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        neighborhood: row.get(3)?,
        host_name: row.get(4)?,
        price_per_night: row.get(5)?,
        luxury_score: row.get(6)?,
        badges: parse_json_list(badges),
        maintenance_items: parse_json_list(maintenance),
        cleanliness_gap: row.get(9)?,
        email: row.get(10)?,
        phone: row.get(11)?,
        instagram: row.get(12)?,
        website: row.get(13)?,
        host_portfolio_size: row.get(14)?,
        description: row.get(15)?,
        status: Status::parse(&status).unwrap_or(Status::Error),
        pitch: row.get(17)?,
    })
}

/// Insert-or-merge by URL. New leads are created in `pending`; existing rows
/// get a field-level merge (provided fields overwrite, absent fields stay)
/// and an `updated_at` refresh. A concurrent insert of the same URL degrades
/// to the merge path via INSERT OR IGNORE. Returns the lead id.
pub fn upsert(conn: &Connection, url: &str, patch: &LeadPatch) -> Result<i64> {
    let badges = patch.badges.as_deref().map(to_json_list);
    let maintenance = patch.maintenance_items.as_deref().map(to_json_list);

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO leads
         (url, title, neighborhood, host_name, price_per_night, luxury_score,
          badges, maintenance_items, cleanliness_gap, email, phone, instagram,
          website, host_portfolio_size, description, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 COALESCE(?14, 1), ?15, 'pending')",
        rusqlite::params![
            url,
            patch.title,
            patch.neighborhood,
            patch.host_name,
            patch.price_per_night,
            patch.luxury_score,
            badges,
            maintenance,
            patch.cleanliness_gap,
            patch.email,
            patch.phone,
            patch.instagram,
            patch.website,
            patch.host_portfolio_size,
            patch.description,
        ],
    )?;

    if inserted == 0 {
        conn.execute(
            "UPDATE leads SET
                title               = COALESCE(?2, title),
                neighborhood        = COALESCE(?3, neighborhood),
                host_name           = COALESCE(?4, host_name),
                price_per_night     = COALESCE(?5, price_per_night),
                luxury_score        = COALESCE(?6, luxury_score),
                badges              = COALESCE(?7, badges),
                maintenance_items   = COALESCE(?8, maintenance_items),
                cleanliness_gap     = COALESCE(?9, cleanliness_gap),
                email               = COALESCE(?10, email),
                phone               = COALESCE(?11, phone),
                instagram           = COALESCE(?12, instagram),
                website             = COALESCE(?13, website),
                host_portfolio_size = COALESCE(?14, host_portfolio_size),
                description         = COALESCE(?15, description),
                updated_at          = datetime('now')
             WHERE url = ?1",
            rusqlite::params![
                url,
                patch.title,
                patch.neighborhood,
                patch.host_name,
                patch.price_per_night,
                patch.luxury_score,
                badges,
                maintenance,
                patch.cleanliness_gap,
                patch.email,
                patch.phone,
                patch.instagram,
                patch.website,
                patch.host_portfolio_size,
                patch.description,
            ],
        )?;
    }

    let id = conn.query_row("SELECT id FROM leads WHERE url = ?1", [url], |r| r.get(0))?;
    Ok(id)
}

/// Unconditional status write. Per-pass transition ordering is the caller's
/// responsibility.
pub fn set_status(conn: &Connection, id: i64, status: Status) -> Result<()> {
    conn.execute(
        "UPDATE leads SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, status.as_str()],
    )?;
    Ok(())
}

pub fn find_by_url(conn: &Connection, url: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM leads WHERE url = ?1", [url], |r| r.get(0))
        .optional()?;
    Ok(id)
}

pub fn get_lead(conn: &Connection, id: i64) -> Result<Lead> {
    let sql = format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS);
    let lead = conn.query_row(&sql, [id], lead_from_row)?;
    Ok(lead)
}

pub fn list_by_status(conn: &Connection, status: Status) -> Result<Vec<Lead>> {
    let sql = format!(
        "SELECT {} FROM leads WHERE status = ?1 ORDER BY id",
        LEAD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([status.as_str()], lead_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn ready_without_pitch(conn: &Connection) -> Result<Vec<Lead>> {
    let sql = format!(
        "SELECT {} FROM leads
         WHERE status = 'ready' AND (pitch IS NULL OR pitch = '')
         ORDER BY luxury_score DESC, id",
        LEAD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], lead_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn save_pitch(conn: &Connection, id: i64, pitch: &str) -> Result<()> {
    conn.execute(
        "UPDATE leads SET pitch = ?2, updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, pitch],
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub ready: usize,
    pub errors: usize,
    pub with_contact: usize,
    pub pitched: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        Ok(conn.query_row(sql, [], |r| r.get(0))?)
    };
    Ok(Stats {
        total: count("SELECT COUNT(*) FROM leads")?,
        pending: count("SELECT COUNT(*) FROM leads WHERE status = 'pending'")?,
        in_progress: count("SELECT COUNT(*) FROM leads WHERE status = 'in_progress'")?,
        ready: count("SELECT COUNT(*) FROM leads WHERE status = 'ready'")?,
        errors: count("SELECT COUNT(*) FROM leads WHERE status = 'error'")?,
        with_contact: count(
            "SELECT COUNT(*) FROM leads WHERE email IS NOT NULL OR phone IS NOT NULL",
        )?,
        pitched: count("SELECT COUNT(*) FROM leads WHERE pitch IS NOT NULL AND pitch != ''")?,
    })
}

// ── Overview ──

pub struct OverviewRow {
    pub id: i64,
    pub title: String,
    pub neighborhood: String,
    pub price_per_night: Option<i64>,
    pub luxury_score: Option<f64>,
    pub host_name: String,
    pub contact: String,
    pub portfolio: i64,
    pub status: String,
}

pub fn fetch_overview(
    conn: &Connection,
    status: Option<&str>,
    min_score: Option<f64>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(s) = status {
        conditions.push(format!("status = ?{}", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }
    if let Some(min) = min_score {
        conditions.push(format!("luxury_score >= ?{}", params.len() + 1));
        params.push(Box::new(min));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT id, COALESCE(title,''), COALESCE(neighborhood,''), price_per_night,
                luxury_score, COALESCE(host_name,''),
                COALESCE(email, COALESCE(phone, COALESCE(instagram, ''))),
                host_portfolio_size, status
         FROM leads{}
         ORDER BY luxury_score DESC, id
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                id: row.get(0)?,
                title: row.get(1)?,
                neighborhood: row.get(2)?,
                price_per_night: row.get(3)?,
                luxury_score: row.get(4)?,
                host_name: row.get(5)?,
                contact: row.get(6)?,
                portfolio: row.get(7)?,
                status: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──
