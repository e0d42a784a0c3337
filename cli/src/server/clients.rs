use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// Claims of an issued API token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Client id
    pub sub: String,
    /// Issue time, seconds since epoch
    pub iat: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Registered clients and the key their API tokens are signed with
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Client>>,
    key: EncodingKey,
}

impl ClientRegistry {
    pub fn new(secret: &str) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Add a client under a fresh id and issue its API token.
    pub async fn register(
        &self,
        name: String,
        description: String,
    ) -> Result<(Client, String), jsonwebtoken::errors::Error> {
        let mut clients = self.clients.write().await;
        let id = super::unique_id(|id| clients.contains_key(id));
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let token = encode(
            &Header::default(),
            &Claims {
                sub: id.clone(),
                iat,
            },
            &self.key,
        )?;

        let client = Client {
            id: id.clone(),
            name,
            description,
        };
        clients.insert(id, client.clone());
        Ok((client, token))
    }

    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    /// Ids of every client, sorted
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
