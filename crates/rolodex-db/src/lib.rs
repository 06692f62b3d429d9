// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use rolodex_app::{
    Company, CompanyId, Contact, ContactId, Page, PageRequest, PageSource, QueryCriteria, Status,
    StatusId,
};
use rusqlite::{Connection, OptionalExtension, named_params, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "rolodex";

const DEFAULT_STATUSES: [&str; 5] = [
    "Imported lead",
    "Not contacted",
    "Contacted",
    "Customer",
    "Closed (lost)",
];

const DEMO_COMPANIES: [&str; 6] = [
    "Acme",
    "Summit Works",
    "Greenleaf Group",
    "Heritage Co",
    "Bright Solutions",
    "Apex Pros",
];
const DEMO_FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Rowan",
];
const DEMO_LAST_NAMES: [&str; 14] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Turner", "Flores", "Bennett", "Price",
];
const DEMO_CONTACTS: usize = 240;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("companies", &["id", "name", "created_at", "updated_at"]),
    ("statuses", &["id", "name", "created_at", "updated_at"]),
    (
        "contacts",
        &[
            "id",
            "first_name",
            "last_name",
            "email",
            "status_id",
            "company_id",
            "created_at",
            "updated_at",
        ],
    ),
];

struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_contacts_name_order",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_contacts_name_order ON contacts (last_name, first_name, id)",
    },
    RequiredIndex {
        name: "idx_contacts_company",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_contacts_company ON contacts (company_id)",
    },
    RequiredIndex {
        name: "idx_contacts_status",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts (status_id)",
    },
];

const CONTACT_COLUMNS: &str = "
    SELECT
      c.id, c.first_name, c.last_name, c.email,
      s.id, s.name, co.id, co.name
    FROM contacts c
    LEFT JOIN statuses s ON s.id = c.status_id
    LEFT JOIN companies co ON co.id = c.company_id
";

const CONTACT_FILTER: &str = "
    WHERE (:email IS NULL OR instr(lower(c.email), lower(:email)) > 0)
      AND (:company IS NULL OR co.name = :company)
      AND (:status IS NULL OR s.name = :status)
";

const CONTACT_ORDER: &str = "ORDER BY c.last_name COLLATE NOCASE, c.first_name COLLATE NOCASE, c.id";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;

        self.seed_defaults()?;
        Ok(())
    }

    pub fn seed_defaults(&self) -> Result<()> {
        let now = now_rfc3339()?;
        for status in DEFAULT_STATUSES {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO statuses (name, created_at, updated_at) VALUES (?, ?, ?)",
                    params![status, now, now],
                )
                .with_context(|| format!("insert default status {status}"))?;
        }
        Ok(())
    }

    pub fn seed_demo_data(&self) -> Result<()> {
        let statuses = self.list_statuses()?;
        let mut companies = Vec::with_capacity(DEMO_COMPANIES.len());
        for name in DEMO_COMPANIES {
            companies.push(self.ensure_company(name)?);
        }

        for index in 0..DEMO_CONTACTS {
            let first = DEMO_FIRST_NAMES[index % DEMO_FIRST_NAMES.len()];
            let last = DEMO_LAST_NAMES[(index * 7 + index / DEMO_FIRST_NAMES.len()) % DEMO_LAST_NAMES.len()];
            let company = companies[(index * 5 + 1) % companies.len()].clone();
            let status = statuses.get((index * 3) % statuses.len().max(1)).cloned();
            let domain = company.name.to_ascii_lowercase().replace(' ', "");
            self.save_contact(&Contact {
                id: None,
                first_name: first.to_owned(),
                last_name: last.to_owned(),
                email: format!(
                    "{}.{}{index}@{domain}.test",
                    first.to_ascii_lowercase(),
                    last.to_ascii_lowercase()
                ),
                status,
                company: Some(company),
            })
            .with_context(|| format!("insert demo contact {index}"))?;
        }
        info!(contacts = DEMO_CONTACTS, "seeded demo data");
        Ok(())
    }

    pub fn list_statuses(&self) -> Result<Vec<Status>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM statuses ORDER BY id ASC")
            .context("prepare statuses query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Status {
                    id: StatusId::new(row.get(0)?),
                    name: row.get(1)?,
                })
            })
            .context("query statuses")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect statuses")
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM companies ORDER BY name ASC")
            .context("prepare companies query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Company {
                    id: CompanyId::new(row.get(0)?),
                    name: row.get(1)?,
                })
            })
            .context("query companies")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect companies")
    }

    pub fn ensure_company(&self, name: &str) -> Result<Company> {
        let name = name.trim();
        if name.is_empty() {
            bail!("company name is required -- enter a company name and retry");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO companies (name, created_at, updated_at) VALUES (?, ?, ?)",
                params![name, now, now],
            )
            .with_context(|| format!("insert company {name}"))?;
        let id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM companies WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .with_context(|| format!("load company {name}"))?;
        Ok(Company {
            id: CompanyId::new(id),
            name: name.to_owned(),
        })
    }

    pub fn get_contact(&self, contact_id: ContactId) -> Result<Contact> {
        let sql = format!("{CONTACT_COLUMNS} WHERE c.id = ?");
        self.conn
            .query_row(&sql, params![contact_id.get()], contact_from_row)
            .optional()
            .context("load contact")?
            .ok_or_else(|| anyhow!("contact {} not found", contact_id.get()))
    }

    pub fn count_contacts(&self, criteria: &QueryCriteria) -> Result<usize> {
        let (email, company, status) = criteria_params(criteria);
        let sql = format!(
            "
            SELECT COUNT(*)
            FROM contacts c
            LEFT JOIN statuses s ON s.id = c.status_id
            LEFT JOIN companies co ON co.id = c.company_id
            {CONTACT_FILTER}
            "
        );
        let count: i64 = self
            .conn
            .query_row(
                &sql,
                named_params! {":email": email, ":company": company, ":status": status},
                |row| row.get(0),
            )
            .context("count contacts")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// One page of contacts ordered by last name, first name, id. `size`
    /// on the returned page is the number of matching contacts.
    pub fn query_page(&self, criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
        let (email, company, status) = criteria_params(criteria);
        let limit = i64::try_from(request.size()).context("page size out of range")?;
        let offset = i64::try_from(request.offset()).context("page offset out of range")?;
        let sql = format!("{CONTACT_COLUMNS} {CONTACT_FILTER} {CONTACT_ORDER} LIMIT :limit OFFSET :offset");

        let mut stmt = self.conn.prepare(&sql).context("prepare contacts page query")?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":email": email,
                    ":company": company,
                    ":status": status,
                    ":limit": limit,
                    ":offset": offset,
                },
                contact_from_row,
            )
            .context("query contacts page")?;
        let content = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect contacts page")?;

        let size = self.count_contacts(criteria)?;
        debug!(
            page = request.index(),
            rows = content.len(),
            total = size,
            "contacts page loaded"
        );
        Ok(Page { content, size })
    }

    pub fn save_contact(&self, contact: &Contact) -> Result<Contact> {
        if contact.email.trim().is_empty() {
            bail!("contact email is required -- enter an email address and retry");
        }
        let now = now_rfc3339()?;
        let status_id = contact.status.as_ref().map(|status| status.id.get());
        let company_id = contact.company.as_ref().map(|company| company.id.get());

        let contact_id = match contact.id {
            Some(contact_id) => {
                let rows_affected = self
                    .conn
                    .execute(
                        "
                        UPDATE contacts
                        SET
                          first_name = ?,
                          last_name = ?,
                          email = ?,
                          status_id = ?,
                          company_id = ?,
                          updated_at = ?
                        WHERE id = ?
                        ",
                        params![
                            contact.first_name,
                            contact.last_name,
                            contact.email,
                            status_id,
                            company_id,
                            now,
                            contact_id.get(),
                        ],
                    )
                    .context("update contact")?;
                if rows_affected == 0 {
                    bail!(
                        "contact {} not found -- it may have been deleted, reload and retry",
                        contact_id.get()
                    );
                }
                contact_id
            }
            None => {
                self.conn
                    .execute(
                        "
                        INSERT INTO contacts (
                          first_name, last_name, email, status_id, company_id,
                          created_at, updated_at
                        ) VALUES (?, ?, ?, ?, ?, ?, ?)
                        ",
                        params![
                            contact.first_name,
                            contact.last_name,
                            contact.email,
                            status_id,
                            company_id,
                            now,
                            now,
                        ],
                    )
                    .context("insert contact")?;
                ContactId::new(self.conn.last_insert_rowid())
            }
        };
        debug!(contact = contact_id.get(), "contact stored");
        self.get_contact(contact_id)
    }

    pub fn delete_contact(&self, contact_id: ContactId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?", params![contact_id.get()])
            .context("delete contact")?;
        if rows_affected == 0 {
            bail!(
                "contact {} not found -- it may already be deleted",
                contact_id.get()
            );
        }
        debug!(contact = contact_id.get(), "contact removed");
        Ok(())
    }
}

#[async_trait(?Send)]
impl PageSource for Store {
    async fn fetch_page(&self, criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
        self.query_page(criteria, request)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("ROLODEX_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set ROLODEX_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("rolodex.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn criteria_params(criteria: &QueryCriteria) -> (Option<&str>, Option<&str>, Option<&str>) {
    match criteria {
        QueryCriteria::Email(text) => (Some(text.as_str()), None, None),
        QueryCriteria::Scope { company, status } => (None, company.as_deref(), status.as_deref()),
    }
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let status_id: Option<i64> = row.get(4)?;
    let status_name: Option<String> = row.get(5)?;
    let company_id: Option<i64> = row.get(6)?;
    let company_name: Option<String> = row.get(7)?;

    Ok(Contact {
        id: Some(ContactId::new(row.get(0)?)),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        status: status_id.zip(status_name).map(|(id, name)| Status {
            id: StatusId::new(id),
            name,
        }),
        company: company_id.zip(company_name).map(|(id, name)| Company {
            id: CompanyId::new(id),
            name,
        }),
    })
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a rolodex-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            params![table],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("look up table {table}"))?;
    Ok(found.is_some())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("prepare table info for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query table info for {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect table info for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
