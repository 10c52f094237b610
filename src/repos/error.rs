/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("conflict")]
    Conflict,
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        // 23505: unique_violation (drinks.title)
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23505")
        {
            return RepoError::Conflict;
        }
        RepoError::Db(e)
    }
}
