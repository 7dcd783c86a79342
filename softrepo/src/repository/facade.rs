//! Per-type repository over a session
//!
//! [`Repository`] implements the read, write and key traits for one entity
//! type by composing a [`ReadQuery`] into a plan, running it through the
//! session's store and, for tracked reads, attaching the results to the
//! session's unit of work.

use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{RepositoryError, RepositoryOperation};
use super::options::ReadQuery;
use super::pagination::{PageMeta, PageRequest, PageableResponse};
use super::traits::{KeyedRepository, ReadRepository, RepositoryResult, WriteRepository};
use crate::cascade::DeleteOutcome;
use crate::entity::{Entity, KeyValue, KeyedEntity};
use crate::query::{Predicate, SortRequest};
use crate::session::Session;
use crate::store::Store;

/// Repository for entity type `T` borrowing a session
pub struct Repository<'s, T, S> {
    session: &'s mut Session<S>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity, S: Store> Repository<'s, T, S> {
    pub(crate) fn new(session: &'s mut Session<S>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// First page using the configured default page size
    pub async fn first_page(&mut self, query: ReadQuery<T>) -> RepositoryResult<PageableResponse<T>> {
        let size = self.session.settings().default_page_size;
        self.get_list(query, PageRequest::index(0, size)).await
    }

    fn token(&self, query: &ReadQuery<T>) -> CancellationToken {
        query
            .cancel
            .clone()
            .unwrap_or_else(|| self.session.cancellation().clone())
    }

    async fn read(
        &mut self,
        query: &ReadQuery<T>,
        window: Option<(usize, usize)>,
        operation: RepositoryOperation,
    ) -> RepositoryResult<Vec<T>> {
        let mut plan = self
            .session
            .plan(query)
            .map_err(|e| e.with_operation(RepositoryOperation::BuildQuery))?;
        if let Some((skip, take)) = window {
            plan = plan.with_window(skip, take);
        }
        let cancel = self.token(query);
        self.session.fetch(&plan, &cancel, operation).await
    }

    async fn page(
        &mut self,
        query: ReadQuery<T>,
        page: PageRequest,
    ) -> RepositoryResult<PageableResponse<T>> {
        let plan = self
            .session
            .plan(&query)
            .map_err(|e| e.with_operation(RepositoryOperation::BuildQuery))?;
        let window = page.resolve(self.session.settings().max_page_size)?;
        let cancel = self.token(&query);

        let total = self.session.count(&plan, &cancel).await?;
        let data = match window.skip() {
            Some(skip) => {
                let plan = plan.with_window(skip, window.take());
                self.session
                    .fetch(&plan, &cancel, RepositoryOperation::List)
                    .await?
            }
            None => Vec::new(),
        };
        let meta = PageMeta::calculate(total, window.page, window.per_page)?;

        debug!(
            entity_type = T::ENTITY_TYPE,
            page = meta.current_page,
            per_page = meta.per_page,
            total_count = meta.total_count,
            "Page fetched"
        );
        Ok(PageableResponse::new(data, meta))
    }

    async fn remove(&mut self, entity: T, permanent: bool) -> RepositoryResult<DeleteOutcome> {
        self.session.delete(Box::new(entity), permanent).await
    }
}

fn by_key<T: Entity>(query: ReadQuery<T>, key: KeyValue) -> ReadQuery<T> {
    query.predicate(Predicate::new(move |row: &T| row.key() == key))
}

impl<T: Entity, S: Store> ReadRepository<T> for Repository<'_, T, S> {
    async fn get(&mut self, query: ReadQuery<T>) -> RepositoryResult<T> {
        self.read(&query, Some((0, 1)), RepositoryOperation::Get)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::no_match(T::ENTITY_TYPE))
    }

    async fn find(&mut self, query: ReadQuery<T>) -> RepositoryResult<Option<T>> {
        Ok(self
            .read(&query, Some((0, 1)), RepositoryOperation::Find)
            .await?
            .into_iter()
            .next())
    }

    async fn first_or_default(&mut self, query: ReadQuery<T>) -> RepositoryResult<Option<T>> {
        self.find(query).await
    }

    async fn single_or_default(&mut self, query: ReadQuery<T>) -> RepositoryResult<Option<T>> {
        let mut rows = self
            .read(&query, Some((0, 2)), RepositoryOperation::Find)
            .await?;
        if rows.len() > 1 {
            return Err(RepositoryError::ambiguous_match(T::ENTITY_TYPE));
        }
        Ok(rows.pop())
    }

    async fn get_all(&mut self, query: ReadQuery<T>) -> RepositoryResult<Vec<T>> {
        self.read(&query, None, RepositoryOperation::List).await
    }

    async fn get_list(
        &mut self,
        query: ReadQuery<T>,
        page: PageRequest,
    ) -> RepositoryResult<PageableResponse<T>> {
        self.page(query, page).await
    }

    async fn get_list_with_sort(
        &mut self,
        query: ReadQuery<T>,
        sort: Vec<SortRequest>,
        page: PageRequest,
    ) -> RepositoryResult<PageableResponse<T>> {
        self.page(query.order_by(sort), page).await
    }

    async fn any(&mut self, query: ReadQuery<T>) -> RepositoryResult<bool> {
        let plan = self
            .session
            .plan(&query)
            .map_err(|e| e.with_operation(RepositoryOperation::BuildQuery))?;
        let cancel = self.token(&query);
        self.session.any(&plan, &cancel).await
    }

    async fn count(&mut self, query: ReadQuery<T>) -> RepositoryResult<u64> {
        let plan = self
            .session
            .plan(&query)
            .map_err(|e| e.with_operation(RepositoryOperation::BuildQuery))?;
        let cancel = self.token(&query);
        self.session.count(&plan, &cancel).await
    }
}

impl<T: KeyedEntity, S: Store> KeyedRepository<T> for Repository<'_, T, S> {
    async fn get_by_key(&mut self, key: T::Key, query: ReadQuery<T>) -> RepositoryResult<T> {
        let key: KeyValue = key.into();
        let id = key.to_string();
        self.read(&by_key(query, key), Some((0, 1)), RepositoryOperation::Get)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::not_found(T::ENTITY_TYPE, id))
    }

    async fn find_by_key(
        &mut self,
        key: T::Key,
        query: ReadQuery<T>,
    ) -> RepositoryResult<Option<T>> {
        Ok(self
            .read(&by_key(query, key.into()), Some((0, 1)), RepositoryOperation::Find)
            .await?
            .into_iter()
            .next())
    }

    async fn delete_by_key(&mut self, key: T::Key) -> RepositoryResult<DeleteOutcome> {
        let key: KeyValue = key.into();
        let id = key.to_string();
        let entity = self
            .read(
                &by_key(ReadQuery::new().tracking(true), key),
                Some((0, 1)),
                RepositoryOperation::Delete,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RepositoryError::not_found(T::ENTITY_TYPE, id)
                    .with_operation(RepositoryOperation::Delete)
            })?;
        self.remove(entity, false).await
    }
}

impl<T: Entity, S: Store> WriteRepository<T> for Repository<'_, T, S> {
    fn add(&mut self, entity: T) -> RepositoryResult<()> {
        self.session.unit_of_work_mut().add(Box::new(entity))
    }

    fn add_range(&mut self, entities: Vec<T>) -> RepositoryResult<()> {
        entities.into_iter().try_for_each(|entity| self.add(entity))
    }

    fn update(&mut self, entity: T) -> RepositoryResult<()> {
        self.session.unit_of_work_mut().update(Box::new(entity))
    }

    fn update_range(&mut self, entities: Vec<T>) -> RepositoryResult<()> {
        entities.into_iter().try_for_each(|entity| self.update(entity))
    }

    async fn delete(&mut self, entity: T) -> RepositoryResult<DeleteOutcome> {
        self.remove(entity, false).await
    }

    async fn delete_range(&mut self, entities: Vec<T>) -> RepositoryResult<Vec<DeleteOutcome>> {
        let mut outcomes = Vec::with_capacity(entities.len());
        for entity in entities {
            outcomes.push(self.remove(entity, false).await?);
        }
        Ok(outcomes)
    }

    async fn delete_permanently(&mut self, entity: T) -> RepositoryResult<DeleteOutcome> {
        self.remove(entity, true).await
    }

    async fn delete_range_permanently(
        &mut self,
        entities: Vec<T>,
    ) -> RepositoryResult<Vec<DeleteOutcome>> {
        let mut outcomes = Vec::with_capacity(entities.len());
        for entity in entities {
            outcomes.push(self.remove(entity, true).await?);
        }
        Ok(outcomes)
    }

    async fn save_changes(&mut self) -> RepositoryResult<u64> {
        self.session.save_changes().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::query::{FilterCondition, SortOrder};
    use crate::repository::RepositoryErrorKind;
    use crate::store::MemoryStore;
    use crate::testing::{self, Account, Category, Customer, Order, OrderLine};
    use crate::unit_of_work::EntryState;

    async fn seeded_orders() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut orders: Vec<Order> = (1..=12).map(|id| testing::order(id, 10, "open")).collect();
        for id in 13..=15 {
            let mut order = testing::order(id, 10, "open");
            order.active = false;
            orders.push(order);
        }
        store.seed(orders).await;
        store
    }

    #[tokio::test]
    async fn test_get_list_pages_active_rows() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);

        let page = session
            .repository::<Order>()
            .get_list(
                ReadQuery::new()
                    .filter(|o: &Order| o.active)
                    .sort_by("id", SortOrder::Asc),
                PageRequest::index(0, 5),
            )
            .await
            .unwrap();

        assert_eq!(page.data.len(), 5);
        assert_eq!(page.meta.total_count, 12);
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.meta.next_page, Some(2));
        assert!(page.meta.is_first_page);
        assert_eq!(page.data[0].id, 1);
    }

    #[tokio::test]
    async fn test_get_list_last_and_out_of_range_pages() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let last = orders
            .get_list(
                ReadQuery::new().filter(|o: &Order| o.active),
                PageRequest::page(3, 5),
            )
            .await
            .unwrap();
        assert_eq!(last.data.len(), 2);
        assert!(last.meta.is_last_page);

        let beyond = orders
            .get_list(ReadQuery::new(), PageRequest::page(9, 5))
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.meta.total_count, 15);

        let before = orders
            .get_list(ReadQuery::new(), PageRequest::page(0, 5))
            .await
            .unwrap();
        assert!(before.data.is_empty());
        assert_eq!(before.meta.current_page, 0);
    }

    #[tokio::test]
    async fn test_invalid_page_size_and_sort_field() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let err = orders
            .get_list(ReadQuery::new(), PageRequest::index(0, 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidPagination);

        let err = orders
            .get_list_with_sort(
                ReadQuery::new(),
                vec![SortRequest::asc("nope")],
                PageRequest::index(0, 5),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidSortField);
    }

    #[tokio::test]
    async fn test_sort_by_status_then_created_desc() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(vec![
                testing::order(1, 10, "open"),
                testing::order(2, 10, "closed"),
                testing::order(3, 10, "open"),
                testing::order(4, 10, "closed"),
            ])
            .await;
        let mut session = testing::session(&store);

        let rows = session
            .repository::<Order>()
            .get_all(ReadQuery::new().order_by(vec![
                SortRequest::asc("status"),
                SortRequest::desc("created_at"),
            ]))
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_get_respects_with_deleted() {
        let store = Arc::new(MemoryStore::new());
        let mut deleted = testing::order(7, 10, "open");
        deleted.deleted.is_deleted = true;
        store.seed(vec![deleted]).await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let found = orders
            .get_by_key(7, ReadQuery::new().with_deleted())
            .await
            .unwrap();
        assert!(found.deleted.is_deleted);

        let err = orders.get_by_key(7, ReadQuery::new()).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.entity_id.as_deref(), Some("7"));

        let err = orders
            .get(ReadQuery::new().filter(|o: &Order| o.id == 7))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_single_or_default_rejects_ambiguity() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let one = orders
            .single_or_default(ReadQuery::new().filter(|o: &Order| o.id == 3))
            .await
            .unwrap();
        assert_eq!(one.map(|o| o.id), Some(3));

        let none = orders
            .single_or_default(ReadQuery::new().filter(|o: &Order| o.id == 99))
            .await
            .unwrap();
        assert!(none.is_none());

        let err = orders
            .single_or_default(ReadQuery::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AmbiguousMatch);
    }

    #[tokio::test]
    async fn test_any_count_and_named_filters() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let inactive = orders
            .count(ReadQuery::new().condition(FilterCondition::eq("active", false)))
            .await
            .unwrap();
        assert_eq!(inactive, 3);
        assert!(orders.any(ReadQuery::new().filter(|o: &Order| o.id == 15)).await.unwrap());
        assert!(!orders.any(ReadQuery::new().filter(|o: &Order| o.id == 16)).await.unwrap());

        let err = orders
            .count(ReadQuery::new().condition(FilterCondition::eq("missing", 1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_tracking_attaches_and_resolves_identity() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);

        let mut order = session
            .repository::<Order>()
            .get_by_key(1, ReadQuery::new())
            .await
            .unwrap();
        order.status = "shipped".into();
        session.repository::<Order>().update(order).unwrap();

        let again = session
            .repository::<Order>()
            .get_by_key(1, ReadQuery::new())
            .await
            .unwrap();
        assert_eq!(again.status, "shipped");

        let detached = session
            .repository::<Order>()
            .get_by_key(2, ReadQuery::new().as_no_tracking())
            .await
            .unwrap();
        assert!(!session.unit_of_work().contains(&detached.identity()));
    }

    #[tokio::test]
    async fn test_include_attaches_related_rows() {
        let store = Arc::new(MemoryStore::new());
        store.seed(vec![testing::order(1, 10, "open")]).await;
        let mut deleted_line = testing::line(101, 1, "b");
        deleted_line.deleted.is_deleted = true;
        store
            .seed(vec![testing::line(100, 1, "a"), deleted_line])
            .await;
        let mut session = testing::session(&store);

        session
            .repository::<Order>()
            .get_all(ReadQuery::new().include("lines"))
            .await
            .unwrap();
        let uow = session.unit_of_work();
        assert!(uow.contains(&testing::line(100, 1, "a").identity()));
        assert!(!uow.contains(&testing::line(101, 1, "b").identity()));

        let err = session
            .repository::<Order>()
            .get_all(ReadQuery::new().include("lines.nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_cancelled_read() {
        let store = seeded_orders().await;
        let mut session = testing::session(&store);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session
            .repository::<Order>()
            .get_all(ReadQuery::new().cancellation(cancel))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_saves() {
        let store = Arc::new(MemoryStore::new());
        store.seed(vec![testing::order(1, 10, "open")]).await;
        store
            .seed(vec![testing::line(100, 1, "a"), testing::line(101, 1, "b")])
            .await;
        let mut session = testing::session(&store);
        let mut orders = session.repository::<Order>();

        let outcome = orders.delete_by_key(1).await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::SoftDeleted(ref ids) if ids.len() == 3));
        assert_eq!(orders.save_changes().await.unwrap(), 3);

        assert!(store.rows::<OrderLine>().await.unwrap().iter().all(|l| l.deleted.is_deleted));
        let visible = session
            .repository::<Order>()
            .count(ReadQuery::new())
            .await
            .unwrap();
        assert_eq!(visible, 0);
    }

    #[tokio::test]
    async fn test_unsafe_one_to_one_and_permanent_retry() {
        let store = Arc::new(MemoryStore::new());
        store.seed(vec![testing::account(1, "a@example.com")]).await;
        store.seed(vec![testing::profile(1, 1)]).await;
        let mut session = testing::session(&store);
        let account = testing::account(1, "a@example.com");

        let err = session
            .repository::<Account>()
            .delete(account.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::UnsafeOneToOneSoftDelete);
        assert!(session.unit_of_work().is_empty());

        let outcome = session
            .repository::<Account>()
            .delete_permanently(account.clone())
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert_eq!(
            session.unit_of_work().state_of(&account.identity()),
            Some(EntryState::Deleted)
        );
        session.save_changes().await.unwrap();
        assert!(store.rows::<Account>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_range_stops_at_first_failure() {
        let store = Arc::new(MemoryStore::new());
        let mut session = testing::session(&store);
        let categories = vec![testing::category(1, "tools"), testing::category(2, "garden")];

        let outcomes = session
            .repository::<Category>()
            .delete_range(categories)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);

        let err = session
            .repository::<Account>()
            .delete_range(vec![testing::account(5, "x@example.com")])
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::UnsafeOneToOneSoftDelete);
        assert_eq!(session.unit_of_work().len(), 2);
    }

    #[tokio::test]
    async fn test_add_range_and_duplicate_add() {
        let store = Arc::new(MemoryStore::new());
        let mut session = testing::session(&store);
        let mut customers = session.repository::<Customer>();

        customers
            .add_range(vec![testing::customer(1, "Ada"), testing::customer(2, "Grace")])
            .unwrap();
        let err = customers.add(testing::customer(1, "Ada")).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);

        assert_eq!(customers.save_changes().await.unwrap(), 2);
        assert_eq!(store.rows::<Customer>().await.unwrap().len(), 2);
    }
}
