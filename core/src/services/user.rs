// core/src/services/user.rs

//! User profile, app settings, saved addresses and help tickets.

use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{clean, doc_path, load, new_id, now};
use crate::auth::{Caller, Role};
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{
  ADDRESSES, ADMINS, APP, FINDERS, HELP_TICKETS, MESSAGES, PROVIDERS, SETTINGS_DOC, USERS,
};
use crate::models::{
  Address, AppSettings, FinderProfile, HelpTicket, HelpTicketMessage, ProviderProfile, ProviderType, TicketStatus,
  UserProfile,
};
use crate::pagination::{paginate, Page, PageRequest};
use crate::store::{DocPath, FieldPath, FieldTransform, Precondition, Query, Store, WriteBatch};
use crate::validation::{self, Validate};

/// Resolves the role for a verified token.
///
/// Order: explicit `role` claim, first recognised entry of `roles`, an
/// `admins/{uid}` record, then the role stored on `users/{uid}`.
#[instrument(name = "user::resolve_role", skip(store, roles))]
pub async fn resolve_role(
  store: &Store,
  uid: &str,
  role_claim: Option<&str>,
  roles: &[String],
) -> MarketResult<Option<Role>> {
  if let Some(role) = role_claim.and_then(|r| r.parse::<Role>().ok()) {
    return Ok(Some(role));
  }
  if let Some(role) = roles.iter().find_map(|r| r.parse::<Role>().ok()) {
    return Ok(Some(role));
  }
  if store.get(&doc_path(ADMINS, uid)?).await?.is_some() {
    return Ok(Some(Role::Admin));
  }
  let user: Option<UserProfile> = store.get_as(&doc_path(USERS, uid)?).await?;
  debug!(found = user.is_some(), "Fell back to stored user role.");
  Ok(user.map(|u| u.role))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
  pub role: Role,
  pub name: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default)]
  pub provider_type: Option<ProviderType>,
  #[serde(default)]
  pub company_name: Option<String>,
}

impl Validate for RegisterInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("name", &self.name)?;
    validation::max_len("name", &self.name, 80)?;
    if self.role == Role::Admin {
      return Err(MarketError::validation("role must be finder or provider"));
    }
    if self.provider_type == Some(ProviderType::Company) {
      validation::required("companyName", self.company_name.as_deref().unwrap_or(""))?;
    }
    Ok(())
  }
}

/// Creates `users/{uid}` and the matching finder/provider profile together.
#[instrument(name = "user::register", skip(store, caller, input), fields(uid = %caller.uid, role = %input.role))]
pub async fn register(store: &Store, caller: &Caller, input: RegisterInput) -> MarketResult<UserProfile> {
  let user_path = doc_path(USERS, &caller.uid)?;
  if store.get(&user_path).await?.is_some() {
    return Err(MarketError::validation("user is already registered"));
  }

  let at = now();
  let name = input.name.trim().to_string();
  let phone = clean(input.phone);
  let avatar_url = clean(input.avatar_url).or_else(|| caller.picture.clone());
  let user = UserProfile {
    id: caller.uid.clone(),
    uid: caller.uid.clone(),
    email: caller.email.clone(),
    name: name.clone(),
    role: input.role,
    phone: phone.clone(),
    avatar_url: avatar_url.clone(),
    created_at: at,
    updated_at: at,
  };

  let mut batch = WriteBatch::new();
  batch.require(user_path.clone(), Precondition::Missing);
  batch.set(user_path, &user)?;
  match input.role {
    Role::Finder => {
      let profile = FinderProfile {
        id: caller.uid.clone(),
        uid: caller.uid.clone(),
        name,
        phone,
        avatar_url,
        bio: None,
        created_at: at,
        updated_at: at,
      };
      batch.set(doc_path(FINDERS, &caller.uid)?, &profile)?;
    }
    Role::Provider => {
      let provider_type = input.provider_type.unwrap_or_default();
      let profile = ProviderProfile {
        id: caller.uid.clone(),
        uid: caller.uid.clone(),
        name,
        provider_type,
        company_name: clean(input.company_name),
        rate_per_hour: None,
        max_workers: Some(1),
        categories: Vec::new(),
        services: Vec::new(),
        bio: None,
        avatar_url,
        phone,
        rating: 0.0,
        rating_count: 0,
        rating_total: 0.0,
        verified: false,
        created_at: at,
        updated_at: at,
      };
      batch.set(doc_path(PROVIDERS, &caller.uid)?, &profile)?;
    }
    Role::Admin => return Err(MarketError::validation("role must be finder or provider")),
  }
  store.commit(batch).await?;
  info!("User registered.");
  Ok(user)
}

pub async fn get_me(store: &Store, caller: &Caller) -> MarketResult<UserProfile> {
  load(store, &doc_path(USERS, &caller.uid)?, "user").await
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
}

impl Validate for UpdateUserInput {
  fn validate(&self) -> MarketResult<()> {
    if let Some(name) = &self.name {
      validation::required("name", name)?;
      validation::max_len("name", name, 80)?;
    }
    Ok(())
  }
}

#[instrument(name = "user::update_me", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn update_me(store: &Store, caller: &Caller, input: UpdateUserInput) -> MarketResult<UserProfile> {
  let mut user = get_me(store, caller).await?;
  if let Some(name) = input.name {
    user.name = name.trim().to_string();
  }
  if input.phone.is_some() {
    user.phone = clean(input.phone);
  }
  if input.avatar_url.is_some() {
    user.avatar_url = clean(input.avatar_url);
  }
  user.updated_at = now();
  store.set(doc_path(USERS, &caller.uid)?, &user).await?;
  Ok(user)
}

fn settings_path(uid: &str) -> MarketResult<DocPath> {
  Ok(doc_path(USERS, uid)?.child(APP, SETTINGS_DOC)?)
}

/// Stored settings, or the defaults when none were saved yet.
pub async fn get_settings(store: &Store, caller: &Caller) -> MarketResult<AppSettings> {
  Ok(store.get_as(&settings_path(&caller.uid)?).await?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub notifications_enabled: Option<bool>,
  #[serde(default)]
  pub dark_mode: Option<bool>,
}

impl Validate for SettingsInput {
  fn validate(&self) -> MarketResult<()> {
    if let Some(language) = &self.language {
      validation::required("language", language)?;
      validation::max_len("language", language, 10)?;
    }
    Ok(())
  }
}

#[instrument(name = "user::update_settings", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn update_settings(store: &Store, caller: &Caller, input: SettingsInput) -> MarketResult<AppSettings> {
  let mut settings = get_settings(store, caller).await?;
  if let Some(language) = input.language {
    settings.language = language.trim().to_string();
  }
  if let Some(enabled) = input.notifications_enabled {
    settings.notifications_enabled = enabled;
  }
  if let Some(dark) = input.dark_mode {
    settings.dark_mode = dark;
  }
  settings.updated_at = Some(now());
  store.set(settings_path(&caller.uid)?, &settings).await?;
  Ok(settings)
}

fn addresses_collection(uid: &str) -> MarketResult<String> {
  Ok(doc_path(USERS, uid)?.subcollection(ADDRESSES)?)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
  #[serde(default)]
  pub label: Option<String>,
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default)]
  pub province: Option<String>,
  #[serde(default)]
  pub latitude: Option<f64>,
  #[serde(default)]
  pub longitude: Option<f64>,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default)]
  pub is_default: Option<bool>,
}

impl Validate for AddressInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("line1", &self.line1)?;
    validation::required("city", &self.city)?;
    if let Some(lat) = self.latitude {
      validation::in_range("latitude", lat, -90.0, 90.0)?;
    }
    if let Some(lng) = self.longitude {
      validation::in_range("longitude", lng, -180.0, 180.0)?;
    }
    Ok(())
  }
}

/// Saved addresses, default first, then most recent.
pub async fn list_addresses(store: &Store, caller: &Caller) -> MarketResult<Vec<Address>> {
  let mut addresses: Vec<Address> = store.query_as(Query::collection(addresses_collection(&caller.uid)?)).await?;
  addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| b.created_at.cmp(&a.created_at)));
  Ok(addresses)
}

pub async fn get_address(store: &Store, uid: &str, id: &str) -> MarketResult<Address> {
  load(store, &doc_path(&addresses_collection(uid)?, id)?, "address").await
}

/// Queues clearing `isDefault` on every other default address.
fn clear_other_defaults(batch: &mut WriteBatch, collection: &str, existing: &[Address], keep: &str) -> MarketResult<()> {
  for other in existing.iter().filter(|a| a.is_default && a.id != keep) {
    batch.update(
      doc_path(collection, &other.id)?,
      vec![(FieldPath::parse("isDefault"), FieldTransform::Set(false.into()))],
    );
  }
  Ok(())
}

#[instrument(name = "user::add_address", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn add_address(store: &Store, caller: &Caller, input: AddressInput) -> MarketResult<Address> {
  let collection = addresses_collection(&caller.uid)?;
  let existing = list_addresses(store, caller).await?;
  let at = now();
  let address = Address {
    id: new_id(),
    label: clean(input.label).unwrap_or_else(|| "Home".to_string()),
    line1: input.line1.trim().to_string(),
    line2: clean(input.line2),
    city: input.city.trim().to_string(),
    province: clean(input.province),
    latitude: input.latitude,
    longitude: input.longitude,
    note: clean(input.note),
    // The first address becomes the default.
    is_default: input.is_default.unwrap_or(false) || existing.is_empty(),
    created_at: at,
    updated_at: at,
  };

  let mut batch = WriteBatch::new();
  if address.is_default {
    clear_other_defaults(&mut batch, &collection, &existing, &address.id)?;
  }
  batch.set(doc_path(&collection, &address.id)?, &address)?;
  store.commit(batch).await?;
  Ok(address)
}

#[instrument(name = "user::update_address", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn update_address(store: &Store, caller: &Caller, id: &str, input: AddressInput) -> MarketResult<Address> {
  let collection = addresses_collection(&caller.uid)?;
  let mut address = get_address(store, &caller.uid, id).await?;
  if let Some(label) = clean(input.label) {
    address.label = label;
  }
  address.line1 = input.line1.trim().to_string();
  address.line2 = clean(input.line2);
  address.city = input.city.trim().to_string();
  address.province = clean(input.province);
  address.latitude = input.latitude;
  address.longitude = input.longitude;
  address.note = clean(input.note);
  if let Some(is_default) = input.is_default {
    address.is_default = is_default;
  }
  address.updated_at = now();

  let mut batch = WriteBatch::new();
  if address.is_default {
    let existing = list_addresses(store, caller).await?;
    clear_other_defaults(&mut batch, &collection, &existing, &address.id)?;
  }
  batch.set(doc_path(&collection, &address.id)?, &address)?;
  store.commit(batch).await?;
  Ok(address)
}

#[instrument(name = "user::delete_address", skip(store, caller), fields(uid = %caller.uid))]
pub async fn delete_address(store: &Store, caller: &Caller, id: &str) -> MarketResult<()> {
  let address = get_address(store, &caller.uid, id).await?;
  store.delete(doc_path(&addresses_collection(&caller.uid)?, &address.id)?).await?;
  Ok(())
}

fn tickets_collection(uid: &str) -> MarketResult<String> {
  Ok(doc_path(USERS, uid)?.subcollection(HELP_TICKETS)?)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpTicketInput {
  pub subject: String,
  #[serde(default)]
  pub category: Option<String>,
  pub message: String,
}

impl Validate for HelpTicketInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("subject", &self.subject)?;
    validation::max_len("subject", &self.subject, 120)?;
    validation::required("message", &self.message)?;
    validation::max_len("message", &self.message, 4000)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessageInput {
  pub text: String,
}

impl Validate for TicketMessageInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("text", &self.text)?;
    validation::max_len("text", &self.text, 4000)
  }
}

pub async fn list_help_tickets(store: &Store, caller: &Caller, page: PageRequest) -> MarketResult<Page<HelpTicket>> {
  let mut tickets: Vec<HelpTicket> = store.query_as(Query::collection(tickets_collection(&caller.uid)?)).await?;
  tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
  Ok(paginate(tickets, page))
}

/// Writes the ticket and its first message in one transaction.
#[instrument(name = "user::create_help_ticket", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn create_help_ticket(store: &Store, caller: &Caller, input: HelpTicketInput) -> MarketResult<HelpTicket> {
  let at = now();
  let ticket_path = doc_path(&tickets_collection(&caller.uid)?, &new_id())?;
  let text = input.message.trim().to_string();
  let ticket = HelpTicket {
    id: ticket_path.id().to_string(),
    subject: input.subject.trim().to_string(),
    category: clean(input.category),
    status: TicketStatus::Open,
    last_message: Some(text.clone()),
    created_at: at,
    updated_at: at,
  };
  let message = HelpTicketMessage {
    id: new_id(),
    sender_uid: caller.uid.clone(),
    sender_role: "user".to_string(),
    text,
    created_at: at,
  };

  let mut tx = store.transaction();
  if tx.get(&ticket_path).await?.is_some() {
    return Err(MarketError::validation("help ticket already exists"));
  }
  let message_path = ticket_path.child(MESSAGES, &message.id)?;
  tx.set(ticket_path, &ticket)?;
  tx.set(message_path, &message)?;
  tx.commit().await?;
  info!(ticket_id = %ticket.id, "Help ticket created.");
  Ok(ticket)
}

async fn load_ticket(store: &Store, uid: &str, ticket_id: &str) -> MarketResult<(DocPath, HelpTicket)> {
  let path = doc_path(&tickets_collection(uid)?, ticket_id)?;
  let ticket = load(store, &path, "help ticket").await?;
  Ok((path, ticket))
}

pub async fn list_ticket_messages(
  store: &Store,
  caller: &Caller,
  ticket_id: &str,
) -> MarketResult<Vec<HelpTicketMessage>> {
  let (path, _) = load_ticket(store, &caller.uid, ticket_id).await?;
  let mut messages: Vec<HelpTicketMessage> = store.query_as(Query::collection(path.subcollection(MESSAGES)?)).await?;
  messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
  Ok(messages)
}

#[instrument(name = "user::add_ticket_message", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn add_ticket_message(
  store: &Store,
  caller: &Caller,
  ticket_id: &str,
  input: TicketMessageInput,
) -> MarketResult<HelpTicketMessage> {
  let (path, ticket) = load_ticket(store, &caller.uid, ticket_id).await?;
  if ticket.status == TicketStatus::Closed {
    return Err(MarketError::validation("help ticket is closed"));
  }
  let at = now();
  let message = HelpTicketMessage {
    id: new_id(),
    sender_uid: caller.uid.clone(),
    sender_role: "user".to_string(),
    text: input.text.trim().to_string(),
    created_at: at,
  };
  let mut batch = WriteBatch::new();
  batch.set(path.child(MESSAGES, &message.id)?, &message)?;
  batch.update(
    path,
    vec![
      (FieldPath::parse("lastMessage"), FieldTransform::set(&message.text)?),
      (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
    ],
  );
  store.commit(batch).await?;
  Ok(message)
}
