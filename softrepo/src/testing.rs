//! Fixture entities shared by the unit tests
//!
//! ```text
//! Customer 1──* Order 1──* OrderLine *──1 Category ──* Category (children)
//!                 │           └ 1──1 Warranty
//!                 │ 1──* Address (owned)
//!                 └ 1──* OrderTag (composite key)
//! Account 1──1 Profile
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::config::RepositoryConfig;
use crate::entity::{
    Capabilities, Concurrency, CorrelationTags, CreationAudit, Entity, KeyValue, KeyedEntity,
    ModificationAudit, SoftDelete,
};
use crate::metadata::{CascadeBehavior, EntityModel, ModelRegistry, NavigationEdge};
use crate::query::FieldRegistry;
use crate::session::Session;
use crate::store::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub created: CreationAudit,
    pub modified: ModificationAudit,
    pub deleted: SoftDelete,
    pub concurrency: Concurrency,
    pub tags: CorrelationTags,
}

static CUSTOMER_FIELDS: Lazy<FieldRegistry<Customer>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |c: &Customer| c.id.into())
        .field("name", |c: &Customer| c.name.as_str().into())
        .build()
});

impl Entity for Customer {
    const ENTITY_TYPE: &'static str = "Customer";
    const CAPABILITIES: Capabilities = Capabilities::FULLY_AUDITED
        .union(Capabilities::CONCURRENCY)
        .union(Capabilities::CORRELATION);

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(
                NavigationEdge::has_many("orders", "Order", "customer_id")
                    .with_cascade(CascadeBehavior::ClientCascade),
            )
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &CUSTOMER_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }

    fn creation_audit(&self) -> Option<&CreationAudit> {
        Some(&self.created)
    }

    fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit> {
        Some(&mut self.created)
    }

    fn modification_audit(&self) -> Option<&ModificationAudit> {
        Some(&self.modified)
    }

    fn modification_audit_mut(&mut self) -> Option<&mut ModificationAudit> {
        Some(&mut self.modified)
    }

    fn concurrency(&self) -> Option<&Concurrency> {
        Some(&self.concurrency)
    }

    fn concurrency_mut(&mut self) -> Option<&mut Concurrency> {
        Some(&mut self.concurrency)
    }

    fn correlation(&self) -> Option<&CorrelationTags> {
        Some(&self.tags)
    }

    fn correlation_mut(&mut self) -> Option<&mut CorrelationTags> {
        Some(&mut self.tags)
    }
}

impl KeyedEntity for Customer {
    type Key = i64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub status: String,
    pub total: i64,
    pub active: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted: SoftDelete,
}

static ORDER_FIELDS: Lazy<FieldRegistry<Order>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |o: &Order| o.id.into())
        .field("customer_id", |o: &Order| o.customer_id.into())
        .field("status", |o: &Order| o.status.as_str().into())
        .field("total", |o: &Order| o.total.into())
        .field("active", |o: &Order| o.active.into())
        .field("note", |o: &Order| o.note.clone().into())
        .field("created_at", |o: &Order| o.created_at.into())
        .build()
});

impl Entity for Order {
    const ENTITY_TYPE: &'static str = "Order";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        match field {
            "customer_id" => Some(self.customer_id.into()),
            _ => None,
        }
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(NavigationEdge::belongs_to("customer", "Customer", "customer_id"))
            .navigation(
                NavigationEdge::has_many("lines", "OrderLine", "order_id")
                    .with_cascade(CascadeBehavior::Cascade),
            )
            .navigation(
                NavigationEdge::has_many("addresses", "Address", "order_id")
                    .with_cascade(CascadeBehavior::Cascade)
                    .owned(),
            )
            .navigation(NavigationEdge::has_many("tags", "OrderTag", "order_id"))
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &ORDER_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }
}

impl KeyedEntity for Order {
    type Key = i64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub sku: String,
    pub category_id: Option<i64>,
    pub deleted: SoftDelete,
}

static LINE_FIELDS: Lazy<FieldRegistry<OrderLine>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |l: &OrderLine| l.id.into())
        .field("order_id", |l: &OrderLine| l.order_id.into())
        .field("sku", |l: &OrderLine| l.sku.as_str().into())
        .build()
});

impl Entity for OrderLine {
    const ENTITY_TYPE: &'static str = "OrderLine";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        match field {
            "order_id" => Some(self.order_id.into()),
            "category_id" => self.category_id.map(KeyValue::from),
            _ => None,
        }
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(NavigationEdge::belongs_to("order", "Order", "order_id"))
            .navigation(NavigationEdge::belongs_to("category", "Category", "category_id"))
            .navigation(
                NavigationEdge::has_one("warranty", "Warranty", "line_id")
                    .with_cascade(CascadeBehavior::Cascade),
            )
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &LINE_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }
}

impl KeyedEntity for OrderLine {
    type Key = i64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warranty {
    pub id: i64,
    pub line_id: i64,
    pub deleted: SoftDelete,
}

static WARRANTY_FIELDS: Lazy<FieldRegistry<Warranty>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |w: &Warranty| w.id.into())
        .field("line_id", |w: &Warranty| w.line_id.into())
        .build()
});

impl Entity for Warranty {
    const ENTITY_TYPE: &'static str = "Warranty";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        (field == "line_id").then(|| self.line_id.into())
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(NavigationEdge::belongs_to_one("line", "OrderLine", "line_id"))
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &WARRANTY_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: i64,
    pub order_id: i64,
    pub line1: String,
}

static ADDRESS_FIELDS: Lazy<FieldRegistry<Address>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |a: &Address| a.id.into())
        .field("order_id", |a: &Address| a.order_id.into())
        .build()
});

impl Entity for Address {
    const ENTITY_TYPE: &'static str = "Address";

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        (field == "order_id").then(|| self.order_id.into())
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id").build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &ADDRESS_FIELDS
    }
}

/// Key-less row identified by `(order_id, tag)`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTag {
    pub order_id: i64,
    pub tag: String,
}

static TAG_FIELDS: Lazy<FieldRegistry<OrderTag>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("order_id", |t: &OrderTag| t.order_id.into())
        .field("tag", |t: &OrderTag| t.tag.as_str().into())
        .build()
});

impl Entity for OrderTag {
    const ENTITY_TYPE: &'static str = "OrderTag";

    fn key(&self) -> KeyValue {
        KeyValue::composite([KeyValue::from(self.order_id), KeyValue::from(self.tag.as_str())])
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        (field == "order_id").then(|| self.order_id.into())
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("order_id+tag").build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &TAG_FIELDS
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created: CreationAudit,
    pub deleted: SoftDelete,
}

static CATEGORY_FIELDS: Lazy<FieldRegistry<Category>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |c: &Category| c.id.into())
        .field("name", |c: &Category| c.name.as_str().into())
        .build()
});

impl Entity for Category {
    const ENTITY_TYPE: &'static str = "Category";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE
        .union(Capabilities::CREATION_AUDITED)
        .union(Capabilities::AUDIT_EXEMPT);

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        match field {
            "parent_id" => self.parent_id.map(KeyValue::from),
            _ => None,
        }
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(
                NavigationEdge::has_many("children", "Category", "parent_id")
                    .with_cascade(CascadeBehavior::Cascade),
            )
            .navigation(NavigationEdge::has_many("lines", "OrderLine", "category_id"))
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &CATEGORY_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }

    fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit> {
        Some(&mut self.created)
    }
}

impl KeyedEntity for Category {
    type Key = i64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub deleted: SoftDelete,
}

static ACCOUNT_FIELDS: Lazy<FieldRegistry<Account>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |a: &Account| a.id.into())
        .field("email", |a: &Account| a.email.as_str().into())
        .build()
});

impl Entity for Account {
    const ENTITY_TYPE: &'static str = "Account";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(
                NavigationEdge::has_one("profile", "Profile", "account_id")
                    .with_cascade(CascadeBehavior::Cascade),
            )
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &ACCOUNT_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }
}

impl KeyedEntity for Account {
    type Key = i64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub account_id: i64,
    pub bio: String,
    pub deleted: SoftDelete,
}

static PROFILE_FIELDS: Lazy<FieldRegistry<Profile>> = Lazy::new(|| {
    FieldRegistry::builder()
        .field("id", |p: &Profile| p.id.into())
        .field("account_id", |p: &Profile| p.account_id.into())
        .build()
});

impl Entity for Profile {
    const ENTITY_TYPE: &'static str = "Profile";
    const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;

    fn key(&self) -> KeyValue {
        self.id.into()
    }

    fn foreign_key(&self, field: &str) -> Option<KeyValue> {
        (field == "account_id").then(|| self.account_id.into())
    }

    fn model() -> EntityModel {
        EntityModel::builder::<Self>("id")
            .navigation(NavigationEdge::belongs_to_one("account", "Account", "account_id"))
            .build()
    }

    fn fields() -> &'static FieldRegistry<Self> {
        &PROFILE_FIELDS
    }

    fn soft_delete(&self) -> Option<&SoftDelete> {
        Some(&self.deleted)
    }

    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        Some(&mut self.deleted)
    }
}

pub fn customer(id: i64, name: &str) -> Customer {
    Customer {
        id,
        name: name.to_string(),
        created: CreationAudit::default(),
        modified: ModificationAudit::default(),
        deleted: SoftDelete::default(),
        concurrency: Concurrency::default(),
        tags: CorrelationTags::default(),
    }
}

pub fn order(id: i64, customer_id: i64, status: &str) -> Order {
    Order {
        id,
        customer_id,
        status: status.to_string(),
        total: 0,
        active: true,
        note: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(id),
        deleted: SoftDelete::default(),
    }
}

pub fn line(id: i64, order_id: i64, sku: &str) -> OrderLine {
    OrderLine {
        id,
        order_id,
        sku: sku.to_string(),
        category_id: None,
        deleted: SoftDelete::default(),
    }
}

pub fn warranty(id: i64, line_id: i64) -> Warranty {
    Warranty {
        id,
        line_id,
        deleted: SoftDelete::default(),
    }
}

pub fn address(id: i64, order_id: i64) -> Address {
    Address {
        id,
        order_id,
        line1: format!("{id} Main St"),
    }
}

pub fn tag(order_id: i64, tag: &str) -> OrderTag {
    OrderTag {
        order_id,
        tag: tag.to_string(),
    }
}

pub fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        parent_id: None,
        created: CreationAudit::default(),
        deleted: SoftDelete::default(),
    }
}

pub fn account(id: i64, email: &str) -> Account {
    Account {
        id,
        email: email.to_string(),
        deleted: SoftDelete::default(),
    }
}

pub fn profile(id: i64, account_id: i64) -> Profile {
    Profile {
        id,
        account_id,
        bio: String::new(),
        deleted: SoftDelete::default(),
    }
}

pub fn registry() -> ModelRegistry {
    ModelRegistry::builder()
        .register::<Customer>()
        .register::<Order>()
        .register::<OrderLine>()
        .register::<Warranty>()
        .register::<Address>()
        .register::<OrderTag>()
        .register::<Category>()
        .register::<Account>()
        .register::<Profile>()
        .build()
        .unwrap()
}

pub fn session(store: &Arc<MemoryStore>) -> Session<MemoryStore> {
    Session::new(
        Arc::clone(store),
        Arc::new(registry()),
        &RepositoryConfig::default(),
    )
}
