//! Postgres-backed store.
//!
//! Ingredient lists and instructions are kept as `jsonb` on the recipe row;
//! "which recipes use item X" is answered with jsonb containment.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `40P01` | `Conflict` | Deadlock detected |
//! | `40001` | `Conflict` | Serialization failure |
//! | `23505` | `Conflict` | Duplicate primary key |
//! | Any other | `Backend` | Other database errors |

use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use galley_core::{InventoryItemId, RecipeId};
use galley_inventory::{InventoryItem, StockAdjustment};
use galley_recipes::{IngredientUse, Recipe};

use super::r#trait::{Database, InventoryStore, RecipeStore, StoreError, Transaction};

/// Tables used by the store. Safe to run on every start.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    id            UUID PRIMARY KEY,
    name          VARCHAR(255) NOT NULL,
    category      VARCHAR(100) NOT NULL,
    quantity      NUMERIC(14, 2) NOT NULL,
    unit_price    NUMERIC(12, 2) NOT NULL,
    unit_type     VARCHAR(50) NOT NULL,
    reorder_level BIGINT NOT NULL,
    description   TEXT NULL,
    supplier      VARCHAR(255) NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS inventory_items_category_name
    ON inventory_items (category, name);

CREATE TABLE IF NOT EXISTS recipes (
    id               UUID PRIMARY KEY,
    name             VARCHAR(255) NOT NULL,
    category         VARCHAR(255) NOT NULL,
    description      TEXT NOT NULL,
    instructions     JSONB NOT NULL DEFAULT '[]'::jsonb,
    ingredients      JSONB NOT NULL DEFAULT '[]'::jsonb,
    preparation_time BIGINT NOT NULL,
    cooking_time     BIGINT NOT NULL,
    serving_size     BIGINT NOT NULL,
    cost_per_serving NUMERIC(12, 2) NOT NULL,
    image            TEXT NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS recipes_ingredients
    ON recipes USING GIN (ingredients jsonb_path_ops);
"#;

const ITEM_COLUMNS: &str = "id, name, category, quantity, unit_price, unit_type, reorder_level, \
                            description, supplier, created_at, updated_at";

const RECIPE_COLUMNS: &str = "id, name, category, description, instructions, ingredients, \
                              preparation_time, cooking_time, serving_size, cost_per_serving, \
                              image, created_at, updated_at";

/// Postgres database handle.
///
/// `PgPool` is internally reference counted; cloning is cheap.
#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let db = Self::new(pool);
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Database for PostgresDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// Open Postgres transaction. Dropping it without commit rolls back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl InventoryStore for PostgresTransaction {
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn lock_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError> {
        let mut uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        uuids.sort();
        uuids.dedup();

        // Rows are locked in the order they are returned.
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE");
        let rows = sqlx::query(&sql)
            .bind(&uuids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn find_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, name, category, quantity, unit_price, unit_type,
                reorder_level, description, supplier, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.unit_type)
        .bind(item.reorder_level)
        .bind(&item.description)
        .bind(&item.supplier)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update_item(&mut self, item: &InventoryItem) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = $2,
                category = $3,
                quantity = $4,
                unit_price = $5,
                unit_type = $6,
                reorder_level = $7,
                description = $8,
                supplier = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.unit_type)
        .bind(item.reorder_level)
        .bind(&item.description)
        .bind(&item.supplier)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn delete_item(&mut self, id: InventoryItemId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(delta = %adjustment.signed_delta()), err)]
    async fn adjust_stock(
        &mut self,
        id: InventoryItemId,
        adjustment: StockAdjustment,
    ) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(adjustment.signed_delta())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        row.map(|r| r.try_get::<Decimal, _>("quantity").map_err(corrupt("inventory_items.quantity")))
            .transpose()
    }

    async fn list_items(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY category, name");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_low_stock(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE quantity <= reorder_level ORDER BY category, name"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_low_stock", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn item_categories(&mut self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT DISTINCT category FROM inventory_items ORDER BY category")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("item_categories", e))
    }
}

#[async_trait::async_trait]
impl RecipeStore for PostgresTransaction {
    async fn find_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_recipe", e))?;
        row.as_ref().map(recipe_from_row).transpose()
    }

    async fn lock_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_recipe", e))?;
        row.as_ref().map(recipe_from_row).transpose()
    }

    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id), err)]
    async fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recipes (
                id, name, category, description, instructions, ingredients,
                preparation_time, cooking_time, serving_size, cost_per_serving,
                image, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(recipe.id.as_uuid())
        .bind(&recipe.name)
        .bind(&recipe.category)
        .bind(&recipe.description)
        .bind(Json(&recipe.instructions))
        .bind(Json(&recipe.ingredients))
        .bind(recipe.preparation_time)
        .bind(recipe.cooking_time)
        .bind(recipe.serving_size)
        .bind(recipe.cost_per_serving)
        .bind(&recipe.image)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_recipe", e))?;
        Ok(())
    }

    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id), err)]
    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE recipes SET
                name = $2,
                category = $3,
                description = $4,
                instructions = $5,
                ingredients = $6,
                preparation_time = $7,
                cooking_time = $8,
                serving_size = $9,
                cost_per_serving = $10,
                image = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(recipe.id.as_uuid())
        .bind(&recipe.name)
        .bind(&recipe.category)
        .bind(&recipe.description)
        .bind(Json(&recipe.instructions))
        .bind(Json(&recipe.ingredients))
        .bind(recipe.preparation_time)
        .bind(recipe.cooking_time)
        .bind(recipe.serving_size)
        .bind(recipe.cost_per_serving)
        .bind(&recipe.image)
        .bind(recipe.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_recipe", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn delete_recipe(&mut self, id: RecipeId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_recipe", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recipes(&mut self) -> Result<Vec<Recipe>, StoreError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY category, name");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_recipes", e))?;
        rows.iter().map(recipe_from_row).collect()
    }

    async fn recipe_categories(&mut self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT DISTINCT category FROM recipes WHERE category <> '' ORDER BY category")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("recipe_categories", e))
    }

    async fn recipes_using_item(&mut self, item: InventoryItemId) -> Result<Vec<RecipeId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM recipes
            WHERE ingredients @> jsonb_build_array(jsonb_build_object('inventory_item_id', $1::text))
            ORDER BY id
            "#,
        )
        .bind(item.as_uuid().to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("recipes_using_item", e))?;
        Ok(ids.into_iter().map(RecipeId::from_uuid).collect())
    }
}

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn corrupt(column: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| StoreError::Corrupt(format!("failed to read {column}: {e}"))
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    Ok(InventoryItem {
        id: InventoryItemId::from_uuid(row.try_get("id").map_err(corrupt("inventory_items.id"))?),
        name: row.try_get("name").map_err(corrupt("inventory_items.name"))?,
        category: row.try_get("category").map_err(corrupt("inventory_items.category"))?,
        quantity: row.try_get("quantity").map_err(corrupt("inventory_items.quantity"))?,
        unit_price: row.try_get("unit_price").map_err(corrupt("inventory_items.unit_price"))?,
        unit_type: row.try_get("unit_type").map_err(corrupt("inventory_items.unit_type"))?,
        reorder_level: row.try_get("reorder_level").map_err(corrupt("inventory_items.reorder_level"))?,
        description: row.try_get("description").map_err(corrupt("inventory_items.description"))?,
        supplier: row.try_get("supplier").map_err(corrupt("inventory_items.supplier"))?,
        created_at: row.try_get("created_at").map_err(corrupt("inventory_items.created_at"))?,
        updated_at: row.try_get("updated_at").map_err(corrupt("inventory_items.updated_at"))?,
    })
}

fn recipe_from_row(row: &PgRow) -> Result<Recipe, StoreError> {
    let Json(instructions): Json<Vec<String>> =
        row.try_get("instructions").map_err(corrupt("recipes.instructions"))?;
    let Json(ingredients): Json<Vec<IngredientUse>> =
        row.try_get("ingredients").map_err(corrupt("recipes.ingredients"))?;

    Ok(Recipe {
        id: RecipeId::from_uuid(row.try_get("id").map_err(corrupt("recipes.id"))?),
        name: row.try_get("name").map_err(corrupt("recipes.name"))?,
        category: row.try_get("category").map_err(corrupt("recipes.category"))?,
        description: row.try_get("description").map_err(corrupt("recipes.description"))?,
        instructions,
        ingredients,
        preparation_time: row.try_get("preparation_time").map_err(corrupt("recipes.preparation_time"))?,
        cooking_time: row.try_get("cooking_time").map_err(corrupt("recipes.cooking_time"))?,
        serving_size: row.try_get("serving_size").map_err(corrupt("recipes.serving_size"))?,
        cost_per_serving: row.try_get("cost_per_serving").map_err(corrupt("recipes.cost_per_serving"))?,
        image: row.try_get("image").map_err(corrupt("recipes.image"))?,
        created_at: row.try_get("created_at").map_err(corrupt("recipes.created_at"))?,
        updated_at: row.try_get("updated_at").map_err(corrupt("recipes.updated_at"))?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("40P01") | Some("40001") | Some("23505") => StoreError::Conflict(msg),
                // numeric_value_out_of_range
                Some("22003") => StoreError::OutOfRange(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
