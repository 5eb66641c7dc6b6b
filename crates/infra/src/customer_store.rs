//! Customer directory and order history.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::info;

use galley_core::{CustomerId, OrderId};
use galley_customers::{Customer, CustomerDraft, Order, OrderDraft};

use crate::errors::{ServiceError, ServiceResult};
use crate::store::StoreError;

/// Customer records with their orders.
pub trait CustomerStore: Send + Sync {
    fn create(&self, draft: &CustomerDraft) -> ServiceResult<Customer>;
    fn get(&self, id: CustomerId) -> ServiceResult<Customer>;
    fn update(&self, id: CustomerId, draft: &CustomerDraft) -> ServiceResult<Customer>;
    /// Deletes the customer together with their orders.
    fn delete(&self, id: CustomerId) -> ServiceResult<Customer>;
    /// All customers ordered by name.
    fn list(&self) -> ServiceResult<Vec<Customer>>;
    fn add_loyalty_points(&self, id: CustomerId, points: i64) -> ServiceResult<Customer>;
    fn place_order(&self, id: CustomerId, draft: &OrderDraft) -> ServiceResult<Order>;
    /// Orders of one customer, newest first.
    fn orders_for(&self, id: CustomerId) -> ServiceResult<Vec<Order>>;
}

impl<S> CustomerStore for Arc<S>
where
    S: CustomerStore + ?Sized,
{
    fn create(&self, draft: &CustomerDraft) -> ServiceResult<Customer> {
        (**self).create(draft)
    }

    fn get(&self, id: CustomerId) -> ServiceResult<Customer> {
        (**self).get(id)
    }

    fn update(&self, id: CustomerId, draft: &CustomerDraft) -> ServiceResult<Customer> {
        (**self).update(id, draft)
    }

    fn delete(&self, id: CustomerId) -> ServiceResult<Customer> {
        (**self).delete(id)
    }

    fn list(&self) -> ServiceResult<Vec<Customer>> {
        (**self).list()
    }

    fn add_loyalty_points(&self, id: CustomerId, points: i64) -> ServiceResult<Customer> {
        (**self).add_loyalty_points(id, points)
    }

    fn place_order(&self, id: CustomerId, draft: &OrderDraft) -> ServiceResult<Order> {
        (**self).place_order(id, draft)
    }

    fn orders_for(&self, id: CustomerId) -> ServiceResult<Vec<Order>> {
        (**self).orders_for(id)
    }
}

#[derive(Debug, Default)]
struct Directory {
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory customer store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    inner: RwLock<Directory>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E>(_: E) -> ServiceError {
        ServiceError::Store(StoreError::Backend("customer store lock poisoned".to_string()))
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn create(&self, draft: &CustomerDraft) -> ServiceResult<Customer> {
        let fields = draft.validate()?;
        let customer = Customer::new(CustomerId::new(), fields, Utc::now());

        let mut dir = self.inner.write().map_err(Self::poisoned)?;
        dir.customers.insert(customer.id, customer.clone());
        info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    fn get(&self, id: CustomerId) -> ServiceResult<Customer> {
        let dir = self.inner.read().map_err(Self::poisoned)?;
        dir.customers.get(&id).cloned().ok_or(ServiceError::NotFound)
    }

    fn update(&self, id: CustomerId, draft: &CustomerDraft) -> ServiceResult<Customer> {
        let fields = draft.validate()?;

        let mut dir = self.inner.write().map_err(Self::poisoned)?;
        let customer = dir.customers.get_mut(&id).ok_or(ServiceError::NotFound)?;
        customer.apply_fields(fields, Utc::now());
        Ok(customer.clone())
    }

    fn delete(&self, id: CustomerId) -> ServiceResult<Customer> {
        let mut dir = self.inner.write().map_err(Self::poisoned)?;
        let customer = dir.customers.remove(&id).ok_or(ServiceError::NotFound)?;
        dir.orders.retain(|_, order| order.customer_id != id);
        info!(customer_id = %id, "customer deleted");
        Ok(customer)
    }

    fn list(&self) -> ServiceResult<Vec<Customer>> {
        let dir = self.inner.read().map_err(Self::poisoned)?;
        let mut customers: Vec<Customer> = dir.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(customers)
    }

    fn add_loyalty_points(&self, id: CustomerId, points: i64) -> ServiceResult<Customer> {
        let mut dir = self.inner.write().map_err(Self::poisoned)?;
        let customer = dir.customers.get_mut(&id).ok_or(ServiceError::NotFound)?;
        let balance = customer.add_loyalty_points(points, Utc::now())?;
        info!(customer_id = %id, points, balance, "loyalty points added");
        Ok(customer.clone())
    }

    fn place_order(&self, id: CustomerId, draft: &OrderDraft) -> ServiceResult<Order> {
        let mut dir = self.inner.write().map_err(Self::poisoned)?;
        if !dir.customers.contains_key(&id) {
            return Err(ServiceError::NotFound);
        }
        let order = Order::place(OrderId::new(), id, draft, Utc::now())?;
        dir.orders.insert(order.id, order.clone());
        info!(customer_id = %id, order_id = %order.id, total = %order.total_amount, "order placed");
        Ok(order)
    }

    fn orders_for(&self, id: CustomerId) -> ServiceResult<Vec<Order>> {
        let dir = self.inner.read().map_err(Self::poisoned)?;
        if !dir.customers.contains_key(&id) {
            return Err(ServiceError::NotFound);
        }
        let mut orders: Vec<Order> = dir.orders.values().filter(|o| o.customer_id == id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }
}
