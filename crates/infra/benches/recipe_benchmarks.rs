use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use galley_core::InventoryItemId;
use galley_infra::blob::InMemoryImageStore;
use galley_infra::coordinator::RecipeCoordinator;
use galley_infra::inventory_service::InventoryService;
use galley_infra::policy::InventoryPolicy;
use galley_infra::store::InMemoryDatabase;
use galley_inventory::ItemDraft;
use galley_recipes::{compute_cost, IngredientDraft, IngredientUse, RecipeDraft};
use rust_decimal::Decimal;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn item_draft(i: usize) -> ItemDraft {
    ItemDraft {
        name: format!("item-{i}"),
        category: format!("cat-{}", i % 4),
        quantity: Some(Decimal::from(1_000_000)),
        unit_price: Some(Decimal::new(125, 2)),
        unit_type: "kg".to_string(),
        reorder_level: Some(10),
        ..ItemDraft::default()
    }
}

fn recipe_draft(ids: &[InventoryItemId]) -> RecipeDraft {
    RecipeDraft {
        name: "Bench".to_string(),
        category: "Mains".to_string(),
        description: "Benchmark recipe".to_string(),
        instructions: vec!["Cook".to_string()],
        ingredients: ids
            .iter()
            .map(|id| IngredientDraft {
                id: Some(*id),
                quantity: Some(Decimal::new(150, 2)),
            })
            .collect(),
        preparation_time: Some(5),
        cooking_time: Some(10),
        serving_size: Some(2),
        cost_per_serving: Some(Decimal::ONE),
        ..RecipeDraft::default()
    }
}

fn bench_compute_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_cost");

    for lines in [1usize, 10, 100].iter() {
        let uses: Vec<IngredientUse> = (0..*lines)
            .map(|i| IngredientUse::new(InventoryItemId::new(), Decimal::new(i as i64 + 1, 2)))
            .collect();
        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &uses, |b, uses| {
            b.iter(|| compute_cost(black_box(uses), |_| Some(Decimal::new(199, 2))));
        });
    }

    group.finish();
}

fn bench_recipe_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe_lifecycle");
    let rt = runtime();

    for ingredient_count in [1usize, 10, 50].iter() {
        let db = Arc::new(InMemoryDatabase::new());
        let inventory = InventoryService::new(db.clone(), InventoryPolicy::default());
        let recipes = RecipeCoordinator::new(db, Arc::new(InMemoryImageStore::new()), InventoryPolicy::default());

        let ids: Vec<InventoryItemId> = rt.block_on(async {
            let mut ids = Vec::new();
            for i in 0..*ingredient_count {
                ids.push(inventory.create_item(&item_draft(i)).await.expect("seed item").id);
            }
            ids
        });
        let draft = recipe_draft(&ids);

        group.bench_with_input(
            BenchmarkId::new("create_update_delete", ingredient_count),
            &draft,
            |b, draft| {
                b.iter(|| {
                    rt.block_on(async {
                        let recipe = recipes.create_recipe(draft).await.expect("create");
                        recipes.update_recipe(recipe.id, draft).await.expect("update");
                        recipes.delete_recipe(recipe.id).await.expect("delete");
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_compute_cost, bench_recipe_lifecycle);
criterion_main!(benches);
