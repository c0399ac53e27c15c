use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::error::AppError;

/// モックモードフラグのキー（値は "true" / "false"）
pub const MOCK_MODE_KEY: &str = "vidiolingua_mock_mode";

/// SQLite の key-value 永続ストア（セッションをまたいで保持する設定）
pub struct PreferenceStore {
    conn: Connection,
}

impl PreferenceStore {
    /// ファイルを開く（親ディレクトリが無ければ作る）
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| AppError::storage(format!("data dir create failed: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| AppError::storage(format!("DB open failed: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::storage(format!("in-memory DB create failed: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), AppError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS preferences (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| AppError::storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::storage(format!("preference read failed: {e}")))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.conn
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| AppError::storage(format!("preference write failed: {e}")))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])
            .map_err(|e| AppError::storage(format!("preference delete failed: {e}")))?;
        Ok(())
    }

    /// 記録済みのモックモード。未記録なら None。
    ///
    /// "false" 以外の値はシミュレーション扱い。
    pub fn mock_mode(&self) -> Result<Option<bool>, AppError> {
        Ok(self.get(MOCK_MODE_KEY)?.map(|v| v != "false"))
    }

    pub fn set_mock_mode(&self, mock: bool) -> Result<(), AppError> {
        self.set(MOCK_MODE_KEY, if mock { "true" } else { "false" })
    }

    /// 記録を消す（次回起動時はヘルスチェックで決め直す）
    pub fn clear_mock_mode(&self) -> Result<(), AppError> {
        self.remove(MOCK_MODE_KEY)
    }
}
