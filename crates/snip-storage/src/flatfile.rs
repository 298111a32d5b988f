use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snip_core::{CodeGenerator, LinkStore, ReadStore, Result, Role, ShortLink, StoreError, User};
use snip_generator::RandomCodeGenerator;
use tokio::sync::Mutex;

/// Default document file, relative to the working directory.
pub const DEFAULT_LINKS_FILE: &str = "links.json";

/// Attempts at finding an unused generated code before giving up.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Flat-file implementation of the link store contract.
///
/// The whole collection lives in one JSON document (an array of link
/// records) mirrored by an in-memory map keyed by short code; every write
/// rewrites the entire document. Reads never touch the file. A single
/// mutex spans map mutation and the document rewrite, so writers within
/// one process cannot lose updates; writers in other processes still race
/// at the file level, last one wins.
///
/// Users are not persisted. The set is seeded with the built-in admin at
/// open and grows with the owners of added links, for the lifetime of the
/// handle only.
pub struct FlatFileStore<G: CodeGenerator = RandomCodeGenerator> {
    path: PathBuf,
    generator: G,
    state: Mutex<State>,
}

struct State {
    links: HashMap<String, ShortLink>,
    users: HashMap<String, User>,
}

impl FlatFileStore {
    /// Loads the document at `path`, creating an empty one if it does not
    /// exist. A document that exists but fails to deserialize makes the
    /// store unavailable; it is not silently replaced.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_generator(path, RandomCodeGenerator::new()).await
    }
}

impl<G: CodeGenerator> FlatFileStore<G> {
    /// Same as [`FlatFileStore::open`] with a caller-chosen code
    /// generator.
    pub async fn open_with_generator(path: impl Into<PathBuf>, generator: G) -> Result<Self> {
        let path = path.into();
        let links = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<ShortLink> = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "failed to parse {}: {e}",
                        path.display()
                    ))
                })?;
                records
                    .into_iter()
                    .map(|link| (link.short.clone(), link))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let links = HashMap::new();
                write_document(&path, &links).await?;
                links
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let mut users = HashMap::new();
        seed_users(&mut users);
        tracing::info!(path = %path.display(), links = links.len(), "link document loaded");

        Ok(Self {
            path,
            generator,
            state: Mutex::new(State { links, users }),
        })
    }

    /// All stored links, ordered by short code.
    pub async fn list(&self) -> Vec<ShortLink> {
        let state = self.state.lock().await;
        let mut links: Vec<ShortLink> = state.links.values().cloned().collect();
        links.sort_by(|a, b| a.short.cmp(&b.short));
        links
    }

    /// Fetches a user from the non-persisted user set.
    pub async fn user(&self, username: &str) -> Result<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user '{username}'")))
    }
}

#[async_trait]
impl<G: CodeGenerator> ReadStore for FlatFileStore<G> {
    async fn get(&self, short: &str) -> Result<ShortLink> {
        let state = self.state.lock().await;
        state
            .links
            .get(short)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("short code '{short}'")))
    }

    async fn exists(&self, short: &str) -> Result<bool> {
        Ok(self.state.lock().await.links.contains_key(short))
    }
}

#[async_trait]
impl<G: CodeGenerator> LinkStore for FlatFileStore<G> {
    async fn put(&self, mut link: ShortLink) -> Result<ShortLink> {
        if link.original.is_empty() {
            return Err(StoreError::InvalidInput(
                "link has no destination url".to_string(),
            ));
        }

        // The lock spans candidate probing, map mutation, and the document
        // rewrite, so a generated code stays unused until it is persisted.
        let mut state = self.state.lock().await;

        if link.short.is_empty() {
            link.short = assign_code(&self.generator, &state.links)?;
        }

        if let Some(owner) = &link.owner {
            state.users.insert(owner.username.clone(), owner.clone());
        }

        state.links.insert(link.short.clone(), link.clone());
        write_document(&self.path, &state.links).await?;
        Ok(link)
    }

    async fn remove(&self, short: &str, requester: &User) -> Result<()> {
        let mut state = self.state.lock().await;

        let existing = state
            .links
            .get(short)
            .ok_or_else(|| StoreError::NotFound(format!("short code '{short}'")))?;
        if !requester.can_remove(existing) {
            return Err(StoreError::Unauthorized(format!(
                "user '{}' may not remove '{short}'",
                requester.username
            )));
        }

        state.links.remove(short);
        write_document(&self.path, &state.links).await
    }
}

/// Installs the built-in accounts. Runs once per open, not on every read.
fn seed_users(users: &mut HashMap<String, User>) {
    let admin = User::new("admin")
        .with_email("admin@mail.com")
        .with_role(Role::Admin);
    users.insert(admin.username.clone(), admin);
}

fn assign_code<G: CodeGenerator>(
    generator: &G,
    links: &HashMap<String, ShortLink>,
) -> Result<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generator.generate();
        if !links.contains_key(&code) {
            return Ok(code);
        }
    }
    Err(StoreError::Conflict(format!(
        "no unused code after {MAX_CODE_ATTEMPTS} attempts"
    )))
}

/// Serializes the entire mapping back to the document, replacing its
/// previous contents. Records are ordered by short code so the document
/// is stable across rewrites.
async fn write_document(path: &Path, links: &HashMap<String, ShortLink>) -> Result<()> {
    let mut records: Vec<&ShortLink> = links.values().collect();
    records.sort_by(|a, b| a.short.cmp(&b.short));
    let bytes = serde_json::to_vec(&records)
        .map_err(|e| StoreError::Query(format!("failed to serialize link document: {e}")))?;
    tokio::fs::write(path, bytes).await.map_err(|e| {
        StoreError::Unavailable(format!("failed to write {}: {e}", path.display()))
    })
}
