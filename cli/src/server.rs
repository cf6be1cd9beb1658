use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use mealplan_core::catalog::Catalog;
use mealplan_core::credentials::{hash_password, validate_password, verify_password};
use mealplan_core::db::DuplicateEmail;
use mealplan_core::models::{
    Day, DietaryPrefs, Goals, MealType, NewUser, Stats, User, UserPreferences, WeeklyPlan,
    normalize_list, validate_email, validate_goals, validate_stats,
};
use mealplan_core::planner::{PlanError, daily_nutrition, plan_for_preferences};
use mealplan_core::preferences::resolve_preferences;
use mealplan_core::recommend::{DEFAULT_LIMIT, MAX_LIMIT, recommend};
use mealplan_core::shopping::build_shopping_list;
use mealplan_core::store::Store;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MiB

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserIdQuery {
    user_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DietaryPrefsRequest {
    user_id: Option<i64>,
    #[serde(flatten)]
    preferences: UserPreferences,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoritesRequest {
    favorite_recipes: Option<Vec<i64>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalsRequest {
    user_id: Option<i64>,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    fiber: Option<f64>,
    sugar: Option<f64>,
    cholesterol: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsRequest {
    user_id: Option<i64>,
    points: Option<i64>,
    cart_items: Option<i64>,
    cart_contents: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MealSlotRequest {
    day_of_week: Option<String>,
    meal_type: Option<String>,
    recipe_id: Option<i64>,
}

#[derive(Deserialize, Default)]
struct GeneratePlanRequest {
    preferences: Option<UserPreferences>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsRequest {
    user_id: Option<i64>,
    preferences: Option<UserPreferences>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge,
    UnsupportedMediaType,
    Unprocessable(String),
    Internal(anyhow::Error),
}

const BODY_TOO_LARGE: &str = "Request body too large";
const INVALID_JSON: &str = "Invalid JSON body";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE.to_string()),
            Self::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected Content-Type: application/json".to_string(),
            ),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::EmptyPool => Self::Unprocessable(err.to_string()),
        }
    }
}

// --- Extractors ---

/// JSON body whose rejections render as `{error}` like every other failure.
/// Parser detail goes to the log, not the client.
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
                StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::UnsupportedMediaType,
                _ => {
                    tracing::debug!(reason = %rejection.body_text(), "rejected JSON body");
                    ApiError::BadRequest(INVALID_JSON.to_string())
                }
            }),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Identity {
    Email(String),
    Id(i64),
}

/// Bearer email first, then the `user-id` header.
fn identity_from_headers(headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let email = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;
        return Ok(Some(Identity::Email(email.to_string())));
    }

    let Some(value) = headers.get("user-id") else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map(str::trim)
        .map_err(|_| ApiError::Unauthorized("Invalid user-id header".to_string()))?;
    if value.contains('@') {
        return Ok(Some(Identity::Email(value.to_string())));
    }
    value
        .parse::<i64>()
        .map(|id| Some(Identity::Id(id)))
        .map_err(|_| ApiError::Unauthorized("Invalid user-id header".to_string()))
}

async fn require_user(state: &AppState, identity: Identity) -> Result<User, ApiError> {
    let user = match identity {
        Identity::Email(email) => state.store.user_by_email(&email).await,
        Identity::Id(id) => state.store.user_by_id(id).await,
    }
    .context("failed to look up user")?;
    user.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// The user named by the request headers.
struct AuthUser(User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = identity_from_headers(&parts.headers)?
            .ok_or_else(|| ApiError::Unauthorized("No authorization header".to_string()))?;
        require_user(state, identity).await.map(Self)
    }
}

/// Resolve the user for routes that take `userId` in the query or body,
/// falling back to the identity headers.
async fn target_user_id(
    state: &AppState,
    headers: &HeaderMap,
    explicit: Option<i64>,
) -> Result<i64, ApiError> {
    let identity = match explicit {
        Some(id) => Identity::Id(id),
        None => identity_from_headers(headers)?
            .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?,
    };
    Ok(require_user(state, identity).await?.id)
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

/// Give framework-generated errors (unknown route, body limit, bad method) the
/// same `{error}` body as handler errors.
async fn json_error_bodies(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
        BODY_TOO_LARGE
    } else {
        status.canonical_reason().unwrap_or("Request failed")
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(json!({ "error": error }).to_string()))
}

// --- Handlers: health and auth ---

/// Absent and blank strings both count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "recipes": state.catalog.len() }))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let user = state
        .store
        .user_by_email(email.trim())
        .await
        .context("failed to look up user")?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(json!({ "user": user, "message": "Login successful" })))
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };
    let email = validate_email(&email).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    validate_password(&password).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let user = state
        .store
        .create_user(NewUser {
            email,
            name,
            password_hash: hash_password(&password),
        })
        .await
        .map_err(|err| {
            if err.is::<DuplicateEmail>() {
                ApiError::Conflict("User already exists".to_string())
            } else {
                ApiError::Internal(err)
            }
        })?;

    tracing::info!(user_id = user.id, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": user, "message": "User created successfully" })),
    ))
}

// --- Handlers: dietary preferences ---

async fn get_dietary_prefs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    let prefs = state
        .store
        .dietary_prefs(user_id)
        .await?
        .unwrap_or_else(|| DietaryPrefs::empty(user_id));
    Ok(Json(json!({ "dietaryPrefs": prefs })))
}

async fn save_dietary_prefs(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<DietaryPrefsRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, req.user_id).await?;
    let prefs = state
        .store
        .save_dietary_prefs(DietaryPrefs {
            user_id,
            restrictions: normalize_list(&req.preferences.restrictions),
            allergies: normalize_list(&req.preferences.allergies),
            tools: normalize_list(&req.preferences.tools),
        })
        .await?;
    Ok(Json(json!({
        "dietaryPrefs": prefs,
        "message": "Dietary preferences saved",
    })))
}

async fn delete_dietary_prefs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    if state.store.delete_dietary_prefs(user_id).await? {
        Ok(Json(json!({ "message": "Dietary preferences deleted" })))
    } else {
        Err(ApiError::NotFound(
            "Dietary preferences not found".to_string(),
        ))
    }
}

// --- Handlers: favorites ---

async fn get_favorites(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "favoriteRecipes": user.favorite_recipes }))
}

async fn save_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<FavoritesRequest>,
) -> Result<Json<Value>, ApiError> {
    let requested = req
        .favorite_recipes
        .ok_or_else(|| ApiError::BadRequest("favoriteRecipes is required".to_string()))?;

    let mut favorites: Vec<i64> = Vec::with_capacity(requested.len());
    for id in requested {
        if !state.catalog.contains(id) {
            return Err(ApiError::BadRequest(format!("Unknown recipe id {id}")));
        }
        if !favorites.contains(&id) {
            favorites.push(id);
        }
    }

    if !state.store.set_favorites(user.id, favorites.clone()).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(Json(json!({
        "favoriteRecipes": favorites,
        "message": "Favorites updated",
    })))
}

// --- Handlers: goals ---

async fn get_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    let goals = state
        .store
        .goals(user_id)
        .await?
        .unwrap_or_else(|| Goals::empty(user_id));
    Ok(Json(json!({ "goals": goals })))
}

async fn save_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<GoalsRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, req.user_id).await?;
    let goals = Goals {
        user_id,
        calories: req.calories.unwrap_or_default(),
        protein: req.protein.unwrap_or_default(),
        carbs: req.carbs.unwrap_or_default(),
        fat: req.fat.unwrap_or_default(),
        fiber: req.fiber.unwrap_or_default(),
        sugar: req.sugar.unwrap_or_default(),
        cholesterol: req.cholesterol.unwrap_or_default(),
    };
    validate_goals(&goals).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let goals = state.store.save_goals(goals).await?;
    Ok(Json(json!({ "goals": goals, "message": "Goals saved" })))
}

async fn delete_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    if state.store.delete_goals(user_id).await? {
        Ok(Json(json!({ "message": "Goals deleted" })))
    } else {
        Err(ApiError::NotFound("Goals not found".to_string()))
    }
}

// --- Handlers: stats ---

async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    let stats = state
        .store
        .stats(user_id)
        .await?
        .unwrap_or_else(|| Stats::empty(user_id));
    Ok(Json(json!({ "stats": stats })))
}

async fn save_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<StatsRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, req.user_id).await?;
    let stats = Stats {
        user_id,
        points: req.points.unwrap_or_default(),
        cart_items: req.cart_items.unwrap_or_default(),
        cart_contents: req.cart_contents.unwrap_or_default(),
    };
    validate_stats(&stats).map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let stats = state.store.save_stats(stats).await?;
    Ok(Json(json!({ "stats": stats, "message": "Stats saved" })))
}

async fn delete_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = target_user_id(&state, &headers, query.user_id).await?;
    if state.store.delete_stats(user_id).await? {
        Ok(Json(json!({ "message": "Stats deleted" })))
    } else {
        Err(ApiError::NotFound("Stats not found".to_string()))
    }
}

// --- Handlers: meal plans ---

fn parse_slot(req: &MealSlotRequest) -> Result<(Day, MealType), ApiError> {
    let (Some(day), Some(meal)) = (req.day_of_week.as_deref(), req.meal_type.as_deref()) else {
        return Err(ApiError::BadRequest(
            "dayOfWeek and mealType are required".to_string(),
        ));
    };
    let day: Day = day
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let meal: MealType = meal
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((day, meal))
}

async fn get_meal_plan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let plan = state.store.meal_plan(user.id).await?.unwrap_or_default();
    Ok(Json(json!({ "mealPlan": plan })))
}

async fn add_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<MealSlotRequest>,
) -> Result<Json<Value>, ApiError> {
    let (day, meal) = parse_slot(&req)?;
    let recipe_id = req
        .recipe_id
        .ok_or_else(|| ApiError::BadRequest("recipeId is required".to_string()))?;
    if !state.catalog.contains(recipe_id) {
        return Err(ApiError::BadRequest(format!(
            "Unknown recipe id {recipe_id}"
        )));
    }

    let plan = state
        .store
        .set_meal_slot(user.id, day, meal, recipe_id)
        .await?;
    Ok(Json(json!({ "mealPlan": plan, "message": "Meal added to plan" })))
}

async fn remove_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<MealSlotRequest>,
) -> Result<Json<Value>, ApiError> {
    let (day, meal) = parse_slot(&req)?;
    let plan = state
        .store
        .remove_meal_slot(user.id, day, meal)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {meal} planned for {day}")))?;
    Ok(Json(json!({
        "mealPlan": plan,
        "message": "Meal removed from plan",
    })))
}

async fn meal_plan_nutrition(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let plan = state.store.meal_plan(user.id).await?.unwrap_or_default();
    let nutrition = daily_nutrition(&plan, &state.catalog);
    Ok(Json(json!({ "nutrition": nutrition })))
}

async fn shopping_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let plan = state.store.meal_plan(user.id).await?.unwrap_or_default();
    let items = build_shopping_list(&plan, &state.catalog);
    Ok(Json(json!({ "items": items })))
}

async fn profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let (prefs, goals, stats) = tokio::try_join!(
        state.store.dietary_prefs(user.id),
        state.store.goals(user.id),
        state.store.stats(user.id),
    )?;
    let id = user.id;
    Ok(Json(json!({
        "user": user,
        "dietaryPrefs": prefs.unwrap_or_else(|| DietaryPrefs::empty(id)),
        "goals": goals.unwrap_or_else(|| Goals::empty(id)),
        "stats": stats.unwrap_or_else(|| Stats::empty(id)),
    })))
}

async fn generate_plan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req: GeneratePlanRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GeneratePlanRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(reason = %e, "rejected generate-plan body");
            ApiError::BadRequest(INVALID_JSON.to_string())
        })?
    };

    let stored = state.store.dietary_prefs(user.id).await?;
    let preferences = resolve_preferences(req.preferences.as_ref(), stored.as_ref());
    let plan: WeeklyPlan = {
        let mut rng = rand::rng();
        plan_for_preferences(&state.catalog, &preferences, &mut rng)?
    };

    let plan = state.store.save_meal_plan(user.id, plan).await?;
    tracing::info!(
        user_id = user.id,
        restrictions = ?preferences.restrictions,
        "generated weekly plan"
    );
    Ok(Json(json!({
        "mealPlan": plan,
        "message": "Meal plan generated successfully",
    })))
}

async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<RecommendationsRequest>,
) -> Result<Json<Value>, ApiError> {
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let user_id = target_user_id(&state, &headers, req.user_id).await?;

    let stored = state.store.dietary_prefs(user_id).await?;
    let preferences = resolve_preferences(req.preferences.as_ref(), stored.as_ref());
    let recommendations = recommend(&state.catalog, &preferences, limit);
    tracing::info!(
        user_id,
        matches = recommendations.total_matches,
        "recommended recipes"
    );
    Ok(Json(json!({
        "recommendations": recommendations,
        "preferences": preferences,
    })))
}

// --- Handlers: recipes ---

async fn list_recipes(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "recipes": state.catalog.all(),
        "count": state.catalog.len(),
    }))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let recipe = state
        .catalog
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))?;
    Ok(Json(json!({ "recipe": recipe })))
}

async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = params.q.unwrap_or_default();
    let results = state
        .catalog
        .search(&query)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(Json(json!({
        "count": results.len(),
        "results": results,
        "query": query.trim(),
    })))
}

// --- Router builder ---

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route(
            "/api/user/dietary-prefs",
            get(get_dietary_prefs)
                .post(save_dietary_prefs)
                .put(save_dietary_prefs)
                .delete(delete_dietary_prefs),
        )
        .route(
            "/api/user/favorites",
            get(get_favorites).post(save_favorites),
        )
        .route(
            "/api/user/goals",
            get(get_goals)
                .put(save_goals)
                .post(save_goals)
                .delete(delete_goals),
        )
        .route(
            "/api/user/stats",
            get(get_stats).post(save_stats).delete(delete_stats),
        )
        .route(
            "/api/user/meal-plans",
            get(get_meal_plan).post(add_meal).delete(remove_meal),
        )
        .route("/api/user/meal-plans/nutrition", get(meal_plan_nutrition))
        .route("/api/user/shopping-list", get(shopping_list))
        .route("/api/user/profile", get(profile))
        .route("/api/meal-plans/generate-plan", post(generate_plan))
        .route("/api/recommendations", post(recommendations))
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/search", get(search_recipes))
        .route("/api/recipes/{id}", get(get_recipe))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::map_response(json_error_bodies))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(state: AppState, port: u16, bind: &str) -> anyhow::Result<()> {
    let recipes = state.catalog.len();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!(recipes, "Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
