use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::api::{ApiError, CurationApi, GraphqlClient};
use crate::auth::IdentityProvider;
use crate::config::AppConfig;
use crate::workspace::{Connector, Workspace};

/// Builds a `GraphqlClient` per access token.
pub struct GraphqlConnector {
    endpoint: String,
    timeout: Duration,
}

impl GraphqlConnector {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            endpoint: config.api_url.clone(),
            timeout: config.http_timeout,
        }
    }
}

impl Connector for GraphqlConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn CurationApi>, ApiError> {
        Ok(Arc::new(GraphqlClient::new(&self.endpoint, token, self.timeout)?))
    }
}

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub connector: GraphqlConnector,
    /// One workspace per Discord user id.
    workspaces: RwLock<HashMap<u64, Arc<Mutex<Workspace>>>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, identity: Arc<dyn IdentityProvider>) -> Self {
        let connector = GraphqlConnector::new(&config);
        Self {
            config,
            identity,
            connector,
            workspaces: RwLock::new(HashMap::new()),
        }
    }

    pub async fn workspace(&self, user_id: u64) -> Arc<Mutex<Workspace>> {
        {
            let workspaces = self.workspaces.read().await;
            if let Some(ws) = workspaces.get(&user_id) {
                return ws.clone();
            }
        }
        let mut workspaces = self.workspaces.write().await;
        workspaces
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Workspace::new())))
            .clone()
    }

    /// Workspace of a user who has already interacted, without creating one.
    pub async fn existing_workspace(&self, user_id: u64) -> Option<Arc<Mutex<Workspace>>> {
        self.workspaces.read().await.get(&user_id).cloned()
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
