//! Company profile and cached company info database operations

use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, new_id, now_timestamp, parse_timestamp};
use crate::models::{Company, CompanyInfo, CompanyInfoFields};

const COMPANY_COLUMNS: &str = "id, name, description, use_case, user_id, created_at, updated_at";
const COMPANY_INFO_COLUMNS: &str =
    "id, website, name, description, industry, products, unique_features, created_at, updated_at";

impl Database {
    // ============================================
    // Company profile methods
    // ============================================

    fn row_to_company(row: &Row) -> SqliteResult<Company> {
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok(Company {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            use_case: row.get(3)?,
            user_id: row.get(4)?,
            created_at: parse_timestamp(5, &created_at)?,
            updated_at: parse_timestamp(6, &updated_at)?,
        })
    }

    pub fn save_company(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        use_case: &str,
    ) -> SqliteResult<Company> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            &format!(
                "INSERT INTO companies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                COMPANY_COLUMNS
            ),
            rusqlite::params![id, name, description, use_case, user_id, now],
        )?;
        drop(conn);

        self.get_company(&id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_company(&self, id: &str) -> SqliteResult<Option<Company>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS),
            [id],
            Self::row_to_company,
        )
        .optional()
    }

    /// The user's most recently updated company profile
    pub fn get_company_for_user(&self, user_id: &str) -> SqliteResult<Option<Company>> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM companies WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT 1",
                COMPANY_COLUMNS
            ),
            [user_id],
            Self::row_to_company,
        )
        .optional()
    }

    pub fn update_company(
        &self,
        id: &str,
        name: &str,
        description: &str,
        use_case: &str,
    ) -> SqliteResult<Option<Company>> {
        let (_, now) = now_timestamp();
        let conn = self.lock();
        let rows_affected = conn.execute(
            "UPDATE companies SET name = ?1, description = ?2, use_case = ?3, updated_at = ?4 WHERE id = ?5",
            rusqlite::params![name, description, use_case, now, id],
        )?;
        drop(conn);

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_company(id)
    }

    // ============================================
    // Company info (per-website cache) methods
    // ============================================

    fn row_to_company_info(row: &Row) -> SqliteResult<CompanyInfo> {
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;
        Ok(CompanyInfo {
            id: row.get(0)?,
            website: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            industry: row.get(4)?,
            products: row.get(5)?,
            unique_features: row.get(6)?,
            created_at: parse_timestamp(7, &created_at)?,
            updated_at: parse_timestamp(8, &updated_at)?,
        })
    }

    pub fn get_company_info_by_website(&self, website: &str) -> SqliteResult<Option<CompanyInfo>> {
        let conn = self.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM company_info WHERE website = ?1",
                COMPANY_INFO_COLUMNS
            ),
            [website],
            Self::row_to_company_info,
        )
        .optional()
    }

    /// Insert the info for a website, or overwrite the existing row
    pub fn save_company_info(&self, website: &str, fields: &CompanyInfoFields) -> SqliteResult<CompanyInfo> {
        let id = new_id();
        let (_, now) = now_timestamp();
        let conn = self.lock();
        conn.execute(
            &format!(
                "INSERT INTO company_info ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(website) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    industry = excluded.industry,
                    products = excluded.products,
                    unique_features = excluded.unique_features,
                    updated_at = excluded.updated_at",
                COMPANY_INFO_COLUMNS
            ),
            rusqlite::params![
                id,
                website,
                fields.name,
                fields.description,
                fields.industry,
                fields.products,
                fields.unique_features,
                now,
            ],
        )?;
        drop(conn);

        self.get_company_info_by_website(website)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_profile_latest_wins() {
        let db = Database::new(":memory:").unwrap();
        let user = db.create_user("ada@example.com", "secret1").unwrap();
        assert!(db.get_company_for_user(&user.id).unwrap().is_none());

        let first = db.save_company(&user.id, "Acme", "Rockets", "Sales").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = db.save_company(&user.id, "Acme 2", "More rockets", "Sales").unwrap();
        assert_eq!(db.get_company_for_user(&user.id).unwrap().unwrap().id, second.id);

        std::thread::sleep(std::time::Duration::from_millis(2));
        let updated = db
            .update_company(&first.id, "Acme Corp", "Rockets", "Research")
            .unwrap()
            .unwrap();
        assert_eq!(updated.use_case, "Research");
        assert!(updated.updated_at > first.updated_at);
        assert_eq!(db.get_company_for_user(&user.id).unwrap().unwrap().id, first.id);

        assert!(db.update_company("missing", "a", "b", "c").unwrap().is_none());
    }

    #[test]
    fn test_company_info_upsert_by_website() {
        let db = Database::new(":memory:").unwrap();
        let mut fields = CompanyInfoFields {
            name: "Acme".to_string(),
            description: "Rockets".to_string(),
            industry: "Aerospace".to_string(),
            products: "Rockets".to_string(),
            unique_features: "Fast".to_string(),
        };
        let first = db.save_company_info("https://acme.test", &fields).unwrap();

        fields.name = "Acme Inc".to_string();
        let second = db.save_company_info("https://acme.test", &fields).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Acme Inc");

        assert!(db.get_company_info_by_website("https://other.test").unwrap().is_none());
    }
}
