use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    AttemptState, Money, NewOrder, Order, OrderError, OrderLine, OrderStatus, OrderTotals,
    PaymentAttempt, PaymentMethod, Product,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CartItem, PaidTransition, Result, StoreError,
    store::Store,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            count_in_stock: row.try_get::<i32, _>("count_in_stock")? as u32,
            seller_name: row.try_get("seller_name")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<(OrderId, OrderLine)> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?);
        let line = OrderLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        };
        Ok((order_id, line))
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status_raw: String = row.try_get("status")?;
        let status =
            OrderStatus::parse(&status_raw).ok_or_else(|| StoreError::UnrecognizedValue {
                column: "status",
                value: status_raw,
            })?;

        let method_raw: String = row.try_get("payment_method")?;
        let payment_method =
            PaymentMethod::parse(&method_raw).ok_or_else(|| StoreError::UnrecognizedValue {
                column: "payment_method",
                value: method_raw,
            })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: row
                .try_get::<Option<Uuid>, _>("user_id")?
                .map(UserId::from_uuid),
            is_guest: row.try_get("is_guest")?,
            guest_email: row.try_get("guest_email")?,
            shipping_address: serde_json::from_value(row.try_get("shipping_address")?)?,
            payment_method,
            totals: OrderTotals {
                items_price: Money::from_cents(row.try_get("items_price_cents")?),
                tax_price: Money::from_cents(row.try_get("tax_price_cents")?),
                shipping_price: Money::from_cents(row.try_get("shipping_price_cents")?),
                discount_price: Money::from_cents(row.try_get("discount_price_cents")?),
                total_price: Money::from_cents(row.try_get("total_price_cents")?),
            },
            lines,
            is_paid: row.try_get("is_paid")?,
            paid_at: row.try_get("paid_at")?,
            payment_result: row.try_get("payment_result")?,
            is_delivered: row.try_get("is_delivered")?,
            delivered_at: row.try_get::<Option<DateTime<Utc>>, _>("delivered_at")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_attempt(row: PgRow) -> Result<PaymentAttempt> {
        let state_raw: String = row.try_get("state")?;
        let state =
            AttemptState::parse(&state_raw).ok_or_else(|| StoreError::UnrecognizedValue {
                column: "state",
                value: state_raw,
            })?;

        let channel_raw: String = row.try_get("channel")?;
        let channel =
            PaymentMethod::parse(&channel_raw).ok_or_else(|| StoreError::UnrecognizedValue {
                column: "channel",
                value: channel_raw,
            })?;

        Ok(PaymentAttempt {
            invoice_id: row.try_get("invoice_id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            channel,
            state,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Loads lines for a set of orders, grouped by order ID.
    async fn lines_for_orders(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, name, image, unit_price_cents, quantity
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let (order_id, line) = Self::row_to_line(row)?;
            grouped.entry(order_id).or_default().push(line);
        }
        Ok(grouped)
    }

    async fn assemble_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut lines = self.lines_for_orders(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                Self::row_to_order(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, user_id, is_guest, guest_email, shipping_address, payment_method,
           items_price_cents, tax_price_cents, shipping_price_cents,
           discount_price_cents, total_price_cents, is_paid, paid_at,
           payment_result, is_delivered, delivered_at, status, created_at, updated_at
    FROM orders
"#;

#[async_trait]
impl Store for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, image, price_cents, count_in_stock, seller_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                image = EXCLUDED.image,
                price_cents = EXCLUDED.price_cents,
                count_in_stock = EXCLUDED.count_in_stock,
                seller_name = EXCLUDED.seller_name
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.image)
        .bind(product.price.cents())
        .bind(product.count_in_stock as i32)
        .bind(&product.seller_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, image, price_cents, count_in_stock, seller_name FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_product_price(&self, id: ProductId, price: Money) -> Result<()> {
        let updated = sqlx::query("UPDATE products SET price_cents = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(price.cents())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrements: a row only updates while enough stock
        // remains, so concurrent checkouts serialize on the product row and
        // the losing transaction aborts here with no partial decrement.
        for line in &new_order.lines {
            let updated = sqlx::query(
                r#"
                UPDATE products
                SET count_in_stock = count_in_stock - $2
                WHERE id = $1 AND count_in_stock >= $2
                "#,
            )
            .bind(line.product_id.as_uuid())
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                let name: Option<String> =
                    sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
                        .bind(line.product_id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;

                // Dropping the transaction rolls back the earlier decrements.
                return Err(match name {
                    Some(name) => StoreError::OutOfStock {
                        product_id: line.product_id,
                        name,
                    },
                    None => StoreError::ProductNotFound(line.product_id),
                });
            }
        }

        let order_id = OrderId::new();
        let now = Utc::now();
        let shipping_address = serde_json::to_value(&new_order.shipping_address)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, is_guest, guest_email, shipping_address, payment_method,
                items_price_cents, tax_price_cents, shipping_price_cents,
                discount_price_cents, total_price_cents, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(new_order.user_id.as_ref().map(UserId::as_uuid))
        .bind(new_order.is_guest)
        .bind(&new_order.guest_email)
        .bind(&shipping_address)
        .bind(new_order.payment_method.as_str())
        .bind(new_order.totals.items_price.cents())
        .bind(new_order.totals.tax_price.cents())
        .bind(new_order.totals.shipping_price.cents())
        .bind(new_order.totals.discount_price.cents())
        .bind(new_order.totals.total_price.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &new_order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, name, image, unit_price_cents, quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.name)
            .bind(&line.image)
            .bind(line.unit_price.cents())
            .bind(line.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(user_id) = new_order.user_id {
            let purchased: Vec<Uuid> = new_order
                .lines
                .iter()
                .map(|line| line.product_id.as_uuid())
                .collect();

            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
                .bind(user_id.as_uuid())
                .bind(&purchased)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(%order_id, lines = new_order.lines.len(), "order created");

        Ok(Order {
            id: order_id,
            user_id: new_order.user_id,
            is_guest: new_order.is_guest,
            guest_email: new_order.guest_email,
            shipping_address: new_order.shipping_address,
            payment_method: new_order.payment_method,
            totals: new_order.totals,
            lines: new_order.lines,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            is_delivered: false,
            delivered_at: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut lines = self.lines_for_orders(&[id.as_uuid()]).await?;
        Ok(Some(Self::row_to_order(
            row,
            lines.remove(&id).unwrap_or_default(),
        )?))
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        self.assemble_orders(rows).await
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "{SELECT_ORDER} WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_ORDER} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        self.assemble_orders(rows).await
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        payment_result: serde_json::Value,
    ) -> Result<PaidTransition> {
        // The conditional update is the at-most-once guarantee: of two racing
        // confirmation signals only one matches `is_paid = FALSE`.
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET is_paid = TRUE, paid_at = now(), status = 'paid',
                payment_result = $2, updated_at = now()
            WHERE id = $1 AND is_paid = FALSE AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .bind(&payment_result)
        .execute(&self.pool)
        .await?;

        let order = self
            .get_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        if updated.rows_affected() == 0 {
            if order.is_paid {
                return Ok(PaidTransition {
                    order,
                    newly_paid: false,
                });
            }
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "pay",
            }));
        }

        Ok(PaidTransition {
            order,
            newly_paid: true,
        })
    }

    async fn mark_delivered(&self, id: OrderId) -> Result<Order> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET is_delivered = TRUE, delivered_at = now(), status = 'delivered', updated_at = now()
            WHERE id = $1 AND status = 'paid'
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        let order = self
            .get_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "deliver",
            }));
        }

        Ok(order)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        let order = self
            .get_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "cancel",
            }));
        }

        Ok(order)
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query("SELECT product_id, quantity FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CartItem {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                })
            })
            .collect()
    }

    async fn insert_attempt(&self, attempt: PaymentAttempt) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // At most one active attempt per order.
        sqlx::query(
            r#"
            UPDATE payment_attempts
            SET state = 'abandoned', updated_at = now()
            WHERE order_id = $1 AND state IN ('initiated', 'pending')
            "#,
        )
        .bind(attempt.order_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payment_attempts (invoice_id, order_id, channel, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&attempt.invoice_id)
        .bind(attempt.order_id.as_uuid())
        .bind(attempt.channel.as_str())
        .bind(attempt.state.as_str())
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_attempt(&self, invoice_id: &str) -> Result<Option<PaymentAttempt>> {
        let row = sqlx::query(
            r#"
            SELECT invoice_id, order_id, channel, state, created_at, updated_at
            FROM payment_attempts
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_attempt).transpose()
    }

    async fn update_attempt_state(
        &self,
        invoice_id: &str,
        state: AttemptState,
    ) -> Result<PaymentAttempt> {
        let row = sqlx::query(
            r#"
            UPDATE payment_attempts
            SET state = $2, updated_at = now()
            WHERE invoice_id = $1
            RETURNING invoice_id, order_id, channel, state, created_at, updated_at
            "#,
        )
        .bind(invoice_id)
        .bind(state.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_attempt(row),
            None => Err(StoreError::AttemptNotFound(invoice_id.to_string())),
        }
    }
}
