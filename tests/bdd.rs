use std::{collections::HashMap, fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use chrono::{Duration, Utc};
use cucumber::{given, then, when, World as _};
use sqlx::types::Json as SqlJson;
use tempfile::TempDir;
use tripplanner::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::init_pool,
    models::{
        itinerary::{Itinerary, Transportation, TransportMode},
        location::Location,
        review::PlaceReview,
        share::{PublicShareLink, ShareInvitation, SharePermission},
        trip::Trip,
    },
    state::AppState,
};
use uuid::Uuid;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    trip: Option<Trip>,
    location: Option<Location>,
    invitation: Option<ShareInvitation>,
    public_link: Option<PublicShareLink>,
    session_id: Option<String>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self, name: &str) -> &AuthenticatedUser {
        self.users
            .get(name)
            .unwrap_or_else(|| panic!("user {name} must be registered first"))
    }

    fn trip(&self) -> &Trip {
        self.trip.as_ref().expect("trip must be created first")
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            public_base_url: "http://localhost:3000".into(),
            weather_api_base: "http://localhost:1".into(),
            places_api_base: "http://localhost:1".into(),
            places_api_key: String::new(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let app = AppState::new(config, db);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn permission_from(raw: &str) -> SharePermission {
    match raw {
        "view" => SharePermission::View,
        "edit" => SharePermission::Edit,
        other => panic!("unknown permission {other}"),
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.trip = None;
    world.location = None;
    world.invitation = None;
    world.public_link = None;
    world.session_id = None;
}

#[given(
    regex = r#"^a registered user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[when(
    regex = r#"^I register a user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    register_user(world, username, email, password).await;
}

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, identifier: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &identifier, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.username, identifier);
}

#[then(regex = r#"^authenticating as \"([^\"]+)\" with password \"([^\"]+)\" fails$"#)]
async fn then_authentication_fails(world: &mut AppWorld, identifier: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &identifier, &password).await;
    assert!(result.is_err(), "authentication should have been refused");
}

#[then(
    regex = r#"^registering a user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\" fails$"#
)]
async fn then_registration_fails(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let result = auth::register_user(world.app_state(), &username, &email, &password).await;
    assert!(result.is_err(), "registration should have been refused");
}

#[given(regex = r#"^\"([^\"]+)\" creates a trip \"([^\"]+)\" with a total budget of (\d+)$"#)]
async fn given_trip(world: &mut AppWorld, username: String, title: String, total_budget: f64) {
    let owner_uuid = world.user(&username).uuid.clone();
    let start = Utc::now();
    let mut trip = Trip::new(owner_uuid, title, start, start + Duration::days(5));
    trip.total_budget = total_budget;
    world
        .app_state()
        .store
        .create_trip(&trip)
        .await
        .expect("create trip");
    world.trip = Some(trip);
}

#[given(regex = r#"^the trip has a location \"([^\"]+)\"$"#)]
async fn given_location(world: &mut AppWorld, name: String) {
    let trip_id = world.trip().id.clone();
    let location = Location::new(trip_id, name, 25.05, 121.57, "1 Somewhere St");
    world
        .app_state()
        .store
        .add_location(&location)
        .await
        .expect("add location");
    world.location = Some(location);
}

#[when(
    regex = r#"^\"([^\"]+)\" adds an itinerary entry with budget (\d+) and transportation cost (\d+)$"#
)]
async fn when_add_itinerary(world: &mut AppWorld, _username: String, budget: f64, cost: f64) {
    let trip_id = world.trip().id.clone();
    let location_id = world
        .location
        .as_ref()
        .expect("location must exist first")
        .id
        .clone();
    let position = world
        .app_state()
        .store
        .next_position(&trip_id)
        .await
        .expect("next position");
    let start = Utc::now();
    let mut entry = Itinerary::new(trip_id, location_id, position, start, start + Duration::hours(2));
    entry.budget = Some(budget);
    entry.transportation = Some(SqlJson(Transportation {
        mode: TransportMode::PublicTransit,
        duration: 30.0,
        distance: Some(4.2),
        cost: Some(cost),
        notes: None,
    }));
    world
        .app_state()
        .store
        .add_itinerary(&entry)
        .await
        .expect("add itinerary");
}

#[then(regex = r#"^the trip budget summary shows (\d+) spent and (-?\d+) remaining$"#)]
async fn then_budget_summary(world: &mut AppWorld, spent: f64, remaining: f64) {
    let trip = world.trip();
    let summary = world
        .app_state()
        .store
        .budget_summary(trip)
        .await
        .expect("budget summary");
    assert_eq!(summary.spent_budget, spent);
    assert_eq!(summary.remaining, remaining);
}

#[then(regex = r#"^the activities category totals (\d+) and transportation totals (\d+)$"#)]
async fn then_budget_categories(world: &mut AppWorld, activities: f64, transportation: f64) {
    let trip = world.trip();
    let summary = world
        .app_state()
        .store
        .budget_summary(trip)
        .await
        .expect("budget summary");
    assert_eq!(summary.by_category.activities, activities);
    assert_eq!(summary.by_category.transportation, transportation);
}

#[when(regex = r#"^\"([^\"]+)\" removes the location from the trip$"#)]
async fn when_remove_location(world: &mut AppWorld, _username: String) {
    let trip_id = world.trip().id.clone();
    let location_id = world
        .location
        .as_ref()
        .expect("location must exist first")
        .id
        .clone();
    let removed = world
        .app_state()
        .store
        .remove_location(&trip_id, &location_id)
        .await
        .expect("remove location");
    assert!(removed, "location should have been removed");
}

#[then(regex = r#"^the trip has (\d+) itinerary entries$"#)]
async fn then_itinerary_count(world: &mut AppWorld, expected: usize) {
    let trip_id = world.trip().id.clone();
    let entries = world
        .app_state()
        .store
        .trip_itineraries(&trip_id)
        .await
        .expect("load itineraries");
    assert_eq!(entries.len(), expected);
}

#[when(regex = r#"^\"([^\"]+)\" shares the trip with \"([^\"]+)\" granting \"([^\"]+)\"$"#)]
async fn when_share_trip(
    world: &mut AppWorld,
    owner: String,
    invitee: String,
    permission: String,
) {
    let trip_id = world.trip().id.clone();
    let owner_uuid = world.user(&owner).uuid.clone();
    let invitee_uuid = world.user(&invitee).uuid.clone();
    world
        .app_state()
        .store
        .upsert_share(
            &trip_id,
            &owner_uuid,
            &invitee_uuid,
            permission_from(&permission).as_str(),
        )
        .await
        .expect("share trip");
}

#[when(regex = r#"^\"([^\"]+)\" revokes the share for \"([^\"]+)\"$"#)]
async fn when_revoke_share(world: &mut AppWorld, _owner: String, invitee: String) {
    let trip_id = world.trip().id.clone();
    let invitee_uuid = world.user(&invitee).uuid.clone();
    let removed = world
        .app_state()
        .store
        .remove_share(&trip_id, &invitee_uuid)
        .await
        .expect("revoke share");
    assert!(removed, "share should have been revoked");
}

#[then(regex = r#"^\"([^\"]+)\" can access the trip$"#)]
async fn then_can_access(world: &mut AppWorld, username: String) {
    assert!(check_access(world, &username).await);
}

#[then(regex = r#"^\"([^\"]+)\" cannot access the trip$"#)]
async fn then_cannot_access(world: &mut AppWorld, username: String) {
    assert!(!check_access(world, &username).await);
}

#[then(regex = r#"^\"([^\"]+)\" can edit the trip$"#)]
async fn then_can_edit(world: &mut AppWorld, username: String) {
    assert!(check_edit(world, &username).await);
}

#[then(regex = r#"^\"([^\"]+)\" cannot edit the trip$"#)]
async fn then_cannot_edit(world: &mut AppWorld, username: String) {
    assert!(!check_edit(world, &username).await);
}

#[then(regex = r#"^\"([^\"]+)\" can manage sharing for the trip$"#)]
async fn then_can_manage(world: &mut AppWorld, username: String) {
    assert!(check_manage(world, &username).await);
}

#[then(regex = r#"^\"([^\"]+)\" cannot manage sharing for the trip$"#)]
async fn then_cannot_manage(world: &mut AppWorld, username: String) {
    assert!(!check_manage(world, &username).await);
}

#[when(regex = r#"^\"([^\"]+)\" invites \"([^\"]+)\" to the trip with \"([^\"]+)\" permission$"#)]
async fn when_invite(world: &mut AppWorld, owner: String, email: String, permission: String) {
    let trip_id = world.trip().id.clone();
    let owner_uuid = world.user(&owner).uuid.clone();
    let invitation = world
        .app_state()
        .sharing
        .create_invitation(&trip_id, &email, &owner_uuid, permission_from(&permission))
        .await
        .expect("create invitation");
    world.invitation = Some(invitation);
}

#[when(regex = r#"^\"([^\"]+)\" accepts the invitation$"#)]
async fn when_accept_invitation(world: &mut AppWorld, username: String) {
    let token = world
        .invitation
        .as_ref()
        .expect("invitation must exist first")
        .token
        .clone();
    let user_uuid = world.user(&username).uuid.clone();
    let app = world.app_state();
    app.sharing
        .accept_invitation(&app.store, &token, &user_uuid)
        .await
        .expect("accept invitation");
}

#[then(regex = r#"^accepting the invitation as \"([^\"]+)\" fails$"#)]
async fn then_accept_fails(world: &mut AppWorld, username: String) {
    let token = world
        .invitation
        .as_ref()
        .expect("invitation must exist first")
        .token
        .clone();
    let user_uuid = world.user(&username).uuid.clone();
    let app = world.app_state();
    let result = app
        .sharing
        .accept_invitation(&app.store, &token, &user_uuid)
        .await;
    assert!(result.is_err(), "acceptance should have been refused");
}

#[when("the invitation has already expired")]
async fn when_invitation_expired(world: &mut AppWorld) {
    let invitation_id = world
        .invitation
        .as_ref()
        .expect("invitation must exist first")
        .id
        .clone();
    sqlx::query("UPDATE share_invitations SET expires_at = ?1 WHERE id = ?2")
        .bind(Utc::now() - Duration::days(1))
        .bind(&invitation_id)
        .execute(&world.app_state().db)
        .await
        .expect("expire invitation");
}

#[then(regex = r#"^the invitation is marked \"([^\"]+)\"$"#)]
async fn then_invitation_status(world: &mut AppWorld, expected: String) {
    let invitation_id = world
        .invitation
        .as_ref()
        .expect("invitation must exist first")
        .id
        .clone();
    let status: String =
        sqlx::query_scalar("SELECT status FROM share_invitations WHERE id = ?1")
            .bind(&invitation_id)
            .fetch_one(&world.app_state().db)
            .await
            .expect("load invitation status");
    assert_eq!(status, expected);
}

#[when(regex = r#"^\"([^\"]+)\" issues a public link for the trip$"#)]
async fn when_issue_public_link(world: &mut AppWorld, _username: String) {
    let trip_id = world.trip().id.clone();
    let app = world.app_state();
    let link = app
        .sharing
        .issue_public_link(&app.store, &trip_id, None)
        .await
        .expect("issue public link");
    world.public_link = Some(link);
}

#[then("the public link resolves to the trip")]
async fn then_public_link_resolves(world: &mut AppWorld) {
    let trip_id = world.trip().id.clone();
    let token = public_link_token(world);
    let app = world.app_state();
    let trip = app
        .sharing
        .resolve_public_link(&app.store, &trip_id, &token)
        .await
        .expect("resolve public link");
    assert_eq!(trip.id, trip_id);
}

#[when("the public link has already expired")]
async fn when_public_link_expired(world: &mut AppWorld) {
    let token = public_link_token(world);
    sqlx::query("UPDATE public_share_links SET expires_at = ?1 WHERE token = ?2")
        .bind(Utc::now() - Duration::days(1))
        .bind(&token)
        .execute(&world.app_state().db)
        .await
        .expect("expire public link");
}

#[then("resolving the public link fails")]
async fn then_public_link_refused(world: &mut AppWorld) {
    let trip_id = world.trip().id.clone();
    let token = public_link_token(world);
    let app = world.app_state();
    let result = app
        .sharing
        .resolve_public_link(&app.store, &trip_id, &token)
        .await;
    assert!(result.is_err(), "public link should have been refused");
}

#[then(regex = r#"^the public link does not resolve for trip \"([^\"]+)\"$"#)]
async fn then_public_link_wrong_trip(world: &mut AppWorld, other_trip: String) {
    let token = public_link_token(world);
    let app = world.app_state();
    let result = app
        .sharing
        .resolve_public_link(&app.store, &other_trip, &token)
        .await;
    assert!(result.is_err(), "token must be bound to its own trip");
}

fn public_link_token(world: &AppWorld) -> String {
    world
        .public_link
        .as_ref()
        .expect("public link must exist first")
        .token
        .clone()
}

#[when(regex = r#"^\"([^\"]+)\" reviews the location with rating (\d+) saying \"([^\"]+)\"$"#)]
async fn when_review_location(
    world: &mut AppWorld,
    username: String,
    rating: i64,
    comment: String,
) {
    let location_id = world
        .location
        .as_ref()
        .expect("location must exist first")
        .id
        .clone();
    let review = PlaceReview {
        id: Uuid::new_v4().to_string(),
        location_id,
        user_uuid: world.user(&username).uuid.clone(),
        rating,
        comment,
        created_at: Utc::now(),
    };
    world
        .app_state()
        .store
        .add_review(&review)
        .await
        .expect("add review");
}

#[then(regex = r#"^the location has (\d+) reviews with an average rating of ([0-9.]+)$"#)]
async fn then_location_reviews(world: &mut AppWorld, count: usize, average: f64) {
    let location_id = world
        .location
        .as_ref()
        .expect("location must exist first")
        .id
        .clone();
    let (reviews, avg) = world
        .app_state()
        .store
        .location_reviews(&location_id)
        .await
        .expect("load reviews");
    assert_eq!(reviews.len(), count);
    assert_eq!(avg, average);
}

#[when(regex = r#"^\"([^\"]+)\" starts a session$"#)]
async fn when_start_session(world: &mut AppWorld, username: String) {
    let user_id = world.user(&username).id;
    let session_id = auth::create_session(world.app_state(), user_id)
        .await
        .expect("create session");
    world.session_id = Some(session_id);
}

#[then(regex = r#"^the session resolves to \"([^\"]+)\"$"#)]
async fn then_session_resolves(world: &mut AppWorld, username: String) {
    let session_id = session_id(world);
    let user = auth::session_user(world.app_state(), &session_id)
        .await
        .expect("resolve session")
        .expect("session should resolve to a user");
    assert_eq!(user.username, username);
}

#[when("the session has already expired")]
async fn when_session_expired(world: &mut AppWorld) {
    let session_id = session_id(world);
    sqlx::query("UPDATE sessions SET expires_at = ?1 WHERE id = ?2")
        .bind(Utc::now() - Duration::days(1))
        .bind(&session_id)
        .execute(&world.app_state().db)
        .await
        .expect("expire session");
}

#[then("the session no longer resolves")]
async fn then_session_gone(world: &mut AppWorld) {
    let session_id = session_id(world);
    let user = auth::session_user(world.app_state(), &session_id)
        .await
        .expect("resolve session");
    assert!(user.is_none(), "expired session should not resolve");
}

fn session_id(world: &AppWorld) -> String {
    world
        .session_id
        .clone()
        .expect("session must exist first")
}

async fn check_access(world: &AppWorld, username: &str) -> bool {
    let trip_id = world.trip().id.clone();
    let user_uuid = world.user(username).uuid.clone();
    world
        .app_state()
        .permissions
        .can_access_trip(&user_uuid, &trip_id)
        .await
        .expect("access check")
}

async fn check_edit(world: &AppWorld, username: &str) -> bool {
    let trip_id = world.trip().id.clone();
    let user_uuid = world.user(username).uuid.clone();
    world
        .app_state()
        .permissions
        .can_edit_trip(&user_uuid, &trip_id)
        .await
        .expect("edit check")
}

async fn check_manage(world: &AppWorld, username: &str) -> bool {
    let trip_id = world.trip().id.clone();
    let user_uuid = world.user(username).uuid.clone();
    world
        .app_state()
        .permissions
        .can_manage_sharing(&user_uuid, &trip_id)
        .await
        .expect("manage check")
}

async fn register_user(world: &mut AppWorld, username: String, email: String, password: String) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    world.users.insert(username, created);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
