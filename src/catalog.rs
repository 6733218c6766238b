//! The loaded creature list and the async resolvers that feed it.

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::CreatureSource;
use crate::creature::Creature;

const DETAIL_FETCH_CONCURRENCY: usize = 12;

/// One page worth of provider listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

/// Outcome of asking the provider for the next form of a creature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum EvolveResolution {
    Evolved(Creature),
    CannotEvolve,
    FetchFailed { name: String },
}

/// Ordered creature list, unique by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogStore {
    creatures: Vec<Creature>,
    cursor: u32,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    /// Provider offset of the next page.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn get(&self, id: u32) -> Option<&Creature> {
        self.creatures.iter().find(|creature| creature.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Creature> {
        self.creatures.get(index)
    }

    pub fn position(&self, id: u32) -> Option<usize> {
        self.creatures.iter().position(|creature| creature.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.position(id).is_some()
    }

    pub fn next_page(&self, page_size: u32) -> PageRequest {
        PageRequest {
            offset: self.cursor,
            limit: page_size,
        }
    }

    /// Appends the creatures not yet present and moves the cursor past the
    /// requested page, however many entries survived. Returns the number added.
    pub fn append_page(&mut self, request: PageRequest, page: Vec<Creature>) -> usize {
        let mut seen: HashSet<u32> = self.creatures.iter().map(|creature| creature.id).collect();
        let before = self.creatures.len();
        for creature in page {
            if seen.insert(creature.id) {
                self.creatures.push(creature);
            }
        }
        self.cursor = request.offset.saturating_add(request.limit);
        self.creatures.len() - before
    }

    pub fn find_local(&self, query: &str) -> Option<&Creature> {
        let query = normalize_query(query);
        if query.is_empty() {
            return None;
        }
        self.creatures
            .iter()
            .find(|creature| creature.matches_query(&query))
    }

    /// Prepends a creature found by a remote search. Returns false when the
    /// id is already listed.
    pub fn insert_found(&mut self, creature: Creature) -> bool {
        if self.contains(creature.id) {
            return false;
        }
        self.creatures.insert(0, creature);
        true
    }

    /// Puts `evolved` where `old_id` was and returns its final position.
    ///
    /// An older copy of the evolved id elsewhere in the list is dropped. That
    /// is the only case where entries after the removed copy shift by one.
    pub fn replace(&mut self, old_id: u32, evolved: Creature) -> Option<usize> {
        let position = self.position(old_id)?;
        let evolved_id = evolved.id;
        self.creatures[position] = evolved;

        let duplicate = self
            .creatures
            .iter()
            .enumerate()
            .position(|(index, creature)| index != position && creature.id == evolved_id);
        match duplicate {
            Some(index) => {
                self.creatures.remove(index);
                Some(if index < position { position - 1 } else { position })
            }
            None => Some(position),
        }
    }
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Lists one page and resolves every entry's details concurrently.
///
/// Entries whose details fail are dropped; survivors keep listing order.
pub async fn fetch_page(source: Arc<dyn CreatureSource>, request: PageRequest) -> Vec<Creature> {
    let entries = source.list_page(request.limit, request.offset).await;
    if entries.is_empty() {
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(DETAIL_FETCH_CONCURRENCY));
    let mut join_set = JoinSet::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let source = source.clone();
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            source
                .fetch_details(&entry.name)
                .await
                .map(|creature| (index, creature))
        });
    }

    let mut fetched = Vec::new();
    while let Some(result) = join_set.join_next().await {
        if let Ok(Some(entry)) = result {
            fetched.push(entry);
        }
    }
    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, creature)| creature).collect()
}

pub async fn resolve_search(source: Arc<dyn CreatureSource>, query: String) -> Option<Creature> {
    let query = normalize_query(&query);
    if query.is_empty() {
        return None;
    }
    source.fetch_details(&query).await
}

pub async fn resolve_evolution(source: Arc<dyn CreatureSource>, name: String) -> EvolveResolution {
    let Some(next) = source.fetch_next_evolution_name(&name).await else {
        return EvolveResolution::CannotEvolve;
    };
    match source.fetch_details(&next).await {
        Some(creature) => EvolveResolution::Evolved(creature),
        None => EvolveResolution::FetchFailed { name: next },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListEntry;
    use crate::creature::{CreatureStats, Sprites};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn creature(id: u32, name: &str) -> Creature {
        Creature {
            id,
            name: name.to_string(),
            types: vec!["normal".into()],
            sprites: Sprites::default(),
            stats: CreatureStats {
                hp: 40,
                attack: 40,
                defense: 40,
                speed: 40,
                ..Default::default()
            },
            abilities: Vec::new(),
            height: 1,
            weight: 1,
        }
    }

    fn ids(store: &CatalogStore) -> Vec<u32> {
        store.creatures().iter().map(|creature| creature.id).collect()
    }

    #[derive(Default)]
    struct FakeSource {
        listing: Vec<String>,
        details: HashMap<String, Creature>,
        evolutions: HashMap<String, String>,
    }

    impl FakeSource {
        fn with(mut self, creature: Creature) -> Self {
            self.details
                .insert(creature.id.to_string(), creature.clone());
            self.details.insert(creature.name.clone(), creature);
            self
        }
    }

    #[async_trait]
    impl CreatureSource for FakeSource {
        async fn list_page(&self, limit: u32, offset: u32) -> Vec<ListEntry> {
            self.listing
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|name| ListEntry {
                    name: name.clone(),
                    url: String::new(),
                })
                .collect()
        }

        async fn fetch_details(&self, name_or_id: &str) -> Option<Creature> {
            self.details.get(name_or_id).cloned()
        }

        async fn fetch_next_evolution_name(&self, name: &str) -> Option<String> {
            self.evolutions.get(name).cloned()
        }
    }

    #[test]
    fn test_append_page_advances_cursor_and_skips_duplicates() {
        let mut store = CatalogStore::new();
        let first = store.next_page(3);
        let added = store.append_page(
            first,
            vec![creature(1, "a"), creature(2, "b"), creature(3, "c")],
        );
        assert_eq!(added, 3);
        assert_eq!(store.cursor(), 3);

        let second = store.next_page(3);
        assert_eq!(second, PageRequest { offset: 3, limit: 3 });
        let added = store.append_page(second, vec![creature(3, "c"), creature(4, "d")]);
        assert_eq!(added, 1);
        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert_eq!(store.cursor(), 6);
    }

    #[test]
    fn test_empty_page_still_advances_cursor() {
        let mut store = CatalogStore::new();
        let request = store.next_page(12);
        assert_eq!(store.append_page(request, Vec::new()), 0);
        assert_eq!(store.cursor(), 12);
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicates_within_a_page_are_dropped() {
        let mut store = CatalogStore::new();
        let request = store.next_page(3);
        store.append_page(request, vec![creature(7, "x"), creature(7, "x"), creature(8, "y")]);
        assert_eq!(ids(&store), vec![7, 8]);
    }

    #[test]
    fn test_find_local_matches_name_or_id() {
        let mut store = CatalogStore::new();
        let request = store.next_page(2);
        store.append_page(request, vec![creature(1, "bulbasaur"), creature(25, "pikachu")]);

        assert_eq!(store.find_local("  PIKACHU ").map(|c| c.id), Some(25));
        assert_eq!(store.find_local("1").map(|c| c.id), Some(1));
        assert!(store.find_local("pika").is_none());
        assert!(store.find_local("   ").is_none());
    }

    #[test]
    fn test_insert_found_prepends_once() {
        let mut store = CatalogStore::new();
        let request = store.next_page(1);
        store.append_page(request, vec![creature(1, "bulbasaur")]);

        assert!(store.insert_found(creature(25, "pikachu")));
        assert!(!store.insert_found(creature(25, "pikachu")));
        assert_eq!(ids(&store), vec![25, 1]);
        assert_eq!(store.cursor(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = CatalogStore::new();
        let request = store.next_page(3);
        store.append_page(
            request,
            vec![creature(1, "bulbasaur"), creature(4, "charmander"), creature(7, "squirtle")],
        );

        assert_eq!(store.replace(4, creature(5, "charmeleon")), Some(1));
        assert_eq!(ids(&store), vec![1, 5, 7]);
        assert_eq!(store.replace(99, creature(100, "voltorb")), None);
    }

    #[test]
    fn test_replace_drops_existing_copy_of_evolved_form() {
        let mut store = CatalogStore::new();
        let request = store.next_page(3);
        store.append_page(
            request,
            vec![creature(2, "ivysaur"), creature(4, "charmander"), creature(1, "bulbasaur")],
        );

        assert_eq!(store.replace(1, creature(2, "ivysaur")), Some(1));
        assert_eq!(ids(&store), vec![4, 2]);
    }

    #[test]
    fn test_replace_shifts_only_entries_after_dropped_copy() {
        let mut store = CatalogStore::new();
        let request = store.next_page(4);
        store.append_page(
            request,
            vec![
                creature(1, "bulbasaur"),
                creature(7, "squirtle"),
                creature(2, "ivysaur"),
                creature(4, "charmander"),
            ],
        );

        assert_eq!(store.replace(1, creature(2, "ivysaur")), Some(0));
        assert_eq!(ids(&store), vec![2, 7, 4]);
        assert_eq!(store.position(7), Some(1));
        assert_eq!(store.position(4), Some(2));
    }

    #[tokio::test]
    async fn test_fetch_page_keeps_listing_order_and_drops_failures() {
        let source = FakeSource {
            listing: vec!["a".into(), "missing".into(), "b".into(), "c".into()],
            ..Default::default()
        }
        .with(creature(1, "a"))
        .with(creature(2, "b"))
        .with(creature(3, "c"));
        let source: Arc<dyn CreatureSource> = Arc::new(source);

        let page = fetch_page(source, PageRequest { offset: 0, limit: 3 }).await;

        assert_eq!(
            page.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_load_twelve_into_empty_store() {
        let mut source = FakeSource::default();
        for id in 1..=20 {
            let name = format!("mon-{id}");
            source.listing.push(name.clone());
            source = source.with(creature(id, &name));
        }
        let source: Arc<dyn CreatureSource> = Arc::new(source);
        let mut store = CatalogStore::new();

        let request = store.next_page(12);
        let page = fetch_page(source, request).await;
        store.append_page(request, page);

        assert_eq!(store.len(), 12);
        assert_eq!(store.cursor(), 12);
        assert_eq!(ids(&store), (1..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_resolve_search_normalizes_query() {
        let source: Arc<dyn CreatureSource> =
            Arc::new(FakeSource::default().with(creature(25, "pikachu")));

        assert_eq!(
            resolve_search(source.clone(), " 25 ".into()).await.map(|c| c.id),
            Some(25)
        );
        assert_eq!(resolve_search(source.clone(), "".into()).await, None);
        assert_eq!(resolve_search(source, "mew".into()).await, None);
    }

    #[tokio::test]
    async fn test_resolve_evolution_outcomes() {
        let mut source = FakeSource::default()
            .with(creature(1, "bulbasaur"))
            .with(creature(2, "ivysaur"));
        source
            .evolutions
            .insert("bulbasaur".into(), "ivysaur".into());
        source
            .evolutions
            .insert("charmander".into(), "charmeleon".into());
        let source: Arc<dyn CreatureSource> = Arc::new(source);

        assert_eq!(
            resolve_evolution(source.clone(), "bulbasaur".into()).await,
            EvolveResolution::Evolved(creature(2, "ivysaur"))
        );
        assert_eq!(
            resolve_evolution(source.clone(), "ivysaur".into()).await,
            EvolveResolution::CannotEvolve
        );
        assert_eq!(
            resolve_evolution(source, "charmander".into()).await,
            EvolveResolution::FetchFailed {
                name: "charmeleon".into()
            }
        );
    }
}
