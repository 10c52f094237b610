/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - store: drinks の永続化, authorizer: bearer token の検証
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::repos::DrinkStore;
use crate::services::auth::TokenAuthorizer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DrinkStore>,
    pub authorizer: Arc<TokenAuthorizer>,
}

impl AppState {
    pub fn new(store: Arc<dyn DrinkStore>, authorizer: Arc<TokenAuthorizer>) -> Self {
        Self { store, authorizer }
    }
}
