use super::clients::ClientRegistry;
use super::games::{Game, DEFAULT_GAME};
use super::payload::assertion_facts;
use super::tls::{self, TlsFiles};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use rulemancer::{fact_list_to_maps, Environment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// One game being played: an environment built from a game
pub struct Room {
    id: String,
    name: String,
    description: String,
    game: Arc<Game>,
    env: Mutex<Environment>,
}

pub struct AppState {
    pool: Arc<Game>,
    games: HashMap<String, Arc<Game>>,
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    clients: ClientRegistry,
    debug: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// `pool` serves rooms that name no game; `games` get fresh ids.
    ///
    /// Without a `secret` API tokens are signed with a random key that
    /// lives as long as the process.
    pub fn new(pool: Game, games: Vec<Game>, secret: Option<String>, debug: bool) -> SharedState {
        let mut by_id = HashMap::new();
        for mut game in games {
            game.id = super::unique_id(|id| id == DEFAULT_GAME || by_id.contains_key(id));
            info!(game = %game.id, name = %game.name, "registered game");
            by_id.insert(game.id.clone(), Arc::new(game));
        }

        let secret = secret.unwrap_or_else(|| {
            warn!("no API token secret configured, using a random one");
            format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            )
        });

        Arc::new(AppState {
            pool: Arc::new(pool),
            games: by_id,
            rooms: RwLock::new(HashMap::new()),
            clients: ClientRegistry::new(&secret),
            debug,
        })
    }

    /// Look a game up by id, then by name. An empty reference is the pool.
    fn find_game(&self, reference: &str) -> Option<Arc<Game>> {
        if reference.is_empty() || reference == DEFAULT_GAME {
            return Some(self.pool.clone());
        }
        self.games.get(reference).cloned().or_else(|| {
            self.games
                .values()
                .find(|game| game.name == reference)
                .cloned()
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    game_ref: String,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct RoomSummary {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct RoomListResponse {
    rooms: Vec<RoomSummary>,
}

#[derive(Debug, Serialize)]
struct RoomInfoResponse {
    id: String,
    name: String,
    description: String,
    game: String,
    facts: usize,
}

#[derive(Debug, Serialize)]
struct GameListResponse {
    games: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateClientRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
struct CreateClientResponse {
    id: String,
    api_token: String,
}

#[derive(Debug, Serialize)]
struct ClientListResponse {
    clients: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AssertRequest {
    fact: String,
}

#[derive(Debug, Serialize)]
struct AssertResponse {
    fact_id: u64,
    fired: usize,
    output: String,
}

/// Relation → its facts as maps, `None` when it has none
type RelationMaps = BTreeMap<String, Option<Vec<BTreeMap<String, String>>>>;

#[derive(Debug, Serialize)]
struct NamedAssertResponse {
    status: &'static str,
    fired: usize,
    output: String,
    response: RelationMaps,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    response: RelationMaps,
}

#[derive(Debug, Deserialize)]
struct FactsQuery {
    relation: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn dump_failed() -> ApiError {
    error!("fact dump allocation failed");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Cannot allocate fact dump",
    )
}

/// Raw fact assertion and fact dumps are only mounted in debug mode.
pub fn router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/games", get(list_games))
        .route("/api/v1/games/:id", get(get_game))
        .route("/api/v1/clients", get(list_clients).post(create_client))
        .route("/api/v1/clients/:id", get(get_client).delete(delete_client))
        .route("/api/v1/rooms", get(list_rooms).post(create_room))
        .route("/api/v1/rooms/:id", get(get_room).delete(delete_room))
        .route("/api/v1/rooms/:id/assert/:assertion", post(assert_named))
        .route("/api/v1/rooms/:id/query/:query", post(query_named));

    if state.debug {
        info!("debug mode: serving raw assert and fact dumps");
        router = router
            .route("/api/v1/rooms/:id/assert", post(assert_fact))
            .route("/api/v1/rooms/:id/facts", get(get_facts));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    state: SharedState,
    host: &str,
    port: u16,
    tls_files: Option<TlsFiles>,
) -> anyhow::Result<()> {
    let tls_config = tls_files.as_ref().map(tls::server_config).transpose()?;
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    match tls_config {
        Some(config) => {
            info!("Rulemancer server listening on https://{}", addr);
            tls::serve(listener, app, config).await
        }
        None => {
            info!("Rulemancer server listening on http://{}", addr);
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rulemancer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_games(State(state): State<SharedState>) -> Json<GameListResponse> {
    let mut games: Vec<String> = state.games.keys().cloned().collect();
    games.sort();
    Json(GameListResponse { games })
}

async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let game = state
        .find_game(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Game '{}' not found", id)))?;
    serde_json::to_value(game.as_ref()).map(Json).map_err(|e| {
        error!("Serializing game failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Cannot describe game")
    })
}

async fn create_client(
    State(state): State<SharedState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<CreateClientResponse>), ApiError> {
    let (client, api_token) = state
        .clients
        .register(payload.name, payload.description)
        .await
        .map_err(|e| {
            error!("Issuing API token failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Cannot issue API token")
        })?;

    info!(client = %client.id, name = %client.name, "registered client");
    Ok((
        StatusCode::CREATED,
        Json(CreateClientResponse {
            id: client.id,
            api_token,
        }),
    ))
}

async fn list_clients(State(state): State<SharedState>) -> Json<ClientListResponse> {
    Json(ClientListResponse {
        clients: state.clients.ids().await,
    })
}

async fn get_client(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .clients
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Client '{}' not found", id)))
}

async fn delete_client(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.clients.remove(&id).await {
        Some(_) => {
            info!(client = %id, "removed client");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Client '{}' not found", id),
        )),
    }
}

async fn find_room(state: &AppState, id: &str) -> Result<Arc<Room>, ApiError> {
    state
        .rooms
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Room '{}' not found", id)))
}

async fn list_rooms(State(state): State<SharedState>) -> Json<RoomListResponse> {
    let rooms = state.rooms.read().await;
    let mut summaries: Vec<RoomSummary> = rooms
        .values()
        .map(|room| RoomSummary {
            id: room.id.clone(),
            name: room.name.clone(),
        })
        .collect();
    summaries.sort_by(|a, b| a.id.cmp(&b.id));
    Json(RoomListResponse { rooms: summaries })
}

async fn create_room(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let game = state.find_game(&payload.game_ref).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Game '{}' not found", payload.game_ref),
        )
    })?;

    // Loading and the first run may take a while; keep them off the
    // async workers.
    let builder = game.clone();
    let env = tokio::task::spawn_blocking(move || builder.build_environment())
        .await
        .map_err(|e| {
            error!("Room build task failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Cannot build room")
        })?
        .map_err(|e| {
            error!("Building room environment failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Cannot build room: {}", e),
            )
        })?;

    let mut rooms = state.rooms.write().await;
    let id = super::unique_id(|id| rooms.contains_key(id));

    info!(room = %id, name = %payload.name, game = %game.id, "created room");
    rooms.insert(
        id.clone(),
        Arc::new(Room {
            id: id.clone(),
            name: payload.name,
            description: payload.description,
            game,
            env: Mutex::new(env),
        }),
    );

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let room = find_room(&state, &id).await?;
    let facts = room.env.lock().await.fact_count();
    Ok(Json(RoomInfoResponse {
        id: room.id.clone(),
        name: room.name.clone(),
        description: room.description.clone(),
        game: room.game.id.clone(),
        facts,
    }))
}

async fn delete_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.rooms.write().await.remove(&id) {
        Some(_) => {
            info!(room = %id, "deleted room");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Room '{}' not found", id),
        )),
    }
}

/// Run `work` on the blocking pool with the room's environment locked
async fn with_env_blocking<T, F>(room: Arc<Room>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&str, &mut Environment) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut env = room.env.blocking_lock();
        work(&room.id, &mut env)
    })
    .await
    .map_err(|e| {
        error!("Room task failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Room task failed")
    })?
}

fn run_rules(id: &str, env: &mut Environment) -> Result<usize, ApiError> {
    env.run(None).map_err(|e| {
        error!(room = %id, "run failed: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Run failed: {}", e),
        )
    })
}

/// Facts of each relation as maps
fn relation_maps(env: &Environment, relations: &[String]) -> Result<RelationMaps, ApiError> {
    let mut maps = RelationMaps::new();
    for relation in relations {
        let dump = env
            .dump_facts_by_relation(relation)
            .ok_or_else(dump_failed)?;
        let items = fact_list_to_maps(relation, &dump)
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
        maps.insert(relation.clone(), items);
    }
    Ok(maps)
}

async fn assert_named(
    State(state): State<SharedState>,
    Path((id, assertion)): Path<(String, String)>,
    Json(body): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<NamedAssertResponse>, ApiError> {
    let room = find_room(&state, &id).await?;
    let Some(relations) = room.game.assertable.get(&assertion) else {
        warn!(room = %id, assertion = %assertion, "unknown assertion");
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Assertion '{}' not found", assertion),
        ));
    };
    let facts = assertion_facts(relations, &body).map_err(|e| {
        warn!(room = %id, assertion = %assertion, "rejected payload: {}", e);
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    })?;
    let results = room
        .game
        .responses
        .get(&assertion)
        .cloned()
        .unwrap_or_default();

    let response = with_env_blocking(room, move |id, env| {
        for fact in &facts {
            env.assert_string(fact).map_err(|e| {
                warn!(room = %id, fact = %fact, "rejected fact: {}", e);
                api_error(StatusCode::BAD_REQUEST, format!("Invalid fact: {}", e))
            })?;
        }
        let fired = run_rules(id, env)?;
        info!(room = %id, facts = facts.len(), fired, "asserted");
        Ok(NamedAssertResponse {
            status: "asserted",
            fired,
            output: env.take_output(),
            response: relation_maps(env, &results)?,
        })
    })
    .await?;

    Ok(Json(response))
}

async fn query_named(
    State(state): State<SharedState>,
    Path((id, query)): Path<(String, String)>,
) -> Result<Json<QueryResponse>, ApiError> {
    let room = find_room(&state, &id).await?;
    let relations = match room.game.queryable.get(&query) {
        None => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("Query '{}' not found", query),
            ))
        }
        Some(relations) if relations.is_empty() => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("No relations for query '{}'", query),
            ))
        }
        Some(relations) => relations,
    };

    let env = room.env.lock().await;
    Ok(Json(QueryResponse {
        response: relation_maps(&env, relations)?,
    }))
}

async fn assert_fact(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<AssertRequest>,
) -> Result<Json<AssertResponse>, ApiError> {
    let room = find_room(&state, &id).await?;

    let response = with_env_blocking(room, move |id, env| {
        let fact_id = env.assert_string(&payload.fact).map_err(|e| {
            warn!(room = %id, fact = %payload.fact, "rejected fact: {}", e);
            api_error(StatusCode::BAD_REQUEST, format!("Invalid fact: {}", e))
        })?;
        let fired = run_rules(id, env)?;
        info!(room = %id, fact = %fact_id, fired, "asserted fact");
        Ok(AssertResponse {
            fact_id: fact_id.index(),
            fired,
            output: env.take_output(),
        })
    })
    .await?;

    Ok(Json(response))
}

async fn get_facts(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<FactsQuery>,
) -> Result<String, ApiError> {
    let room = find_room(&state, &id).await?;
    let env = room.env.lock().await;

    match &params.relation {
        Some(relation) => env.dump_facts_by_relation(relation),
        None => env.dump_facts(),
    }
    .ok_or_else(dump_failed)
}
