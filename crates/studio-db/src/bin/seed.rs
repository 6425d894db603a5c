//! # Seed Data Generator
//!
//! Populates a development database with a small studio: cost
//! configuration, materials, catalog products, clients, stock rows and a few orders
//! (one of them delivered, so the stock ledger has a draw in it).
//!
//! ## Usage
//! ```bash
//! # Seed ./studio.db
//! cargo run -p studio-db --bin seed
//!
//! # Specify database path (or set STUDIO_DB_PATH)
//! cargo run -p studio-db --bin seed -- --db ./data/studio.db
//! ```

use chrono::{Duration, Utc};
use std::env;
use studio_core::money::{format_brl, format_percent};
use studio_core::{
    AdjustmentDirection, Capabilities, Client, Material, NewOrder, OrderLineDraft, OrderStatus, Product,
    ProductCategory, Role, TenantConfig, DEFAULT_TENANT_ID,
};
use studio_db::{init_tracing, Database, DbConfig, StudioService};

/// (name, price per kg)
const MATERIALS: &[(&str, f64)] = &[("PLA", 120.0), ("PETG", 140.0), ("MDF 3mm", 35.0)];

/// (name, city, neighborhood, channel)
const CLIENTS: &[(&str, &str, &str, &str)] = &[
    ("Ana Souza", "Fortaleza", "Aldeota", "Instagram"),
    ("Bruno Lima", "Recife", "Boa Viagem", "Indicação"),
];

/// (material, color, min grams, grams bought)
const STOCK: &[(&str, &str, f64, f64)] = &[
    ("PLA", "Preto", 200.0, 1000.0),
    ("PLA", "Branco", 200.0, 750.0),
    ("PETG", "Azul", 300.0, 250.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = DbConfig::from_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config = config.path(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Studio Manager Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $STUDIO_DB_PATH or ./studio.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Studio Manager Seed Data Generator");
    println!("====================================");
    println!("Database: {}", config.path.display());
    println!();

    let db = Database::new(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.materials().list_active(DEFAULT_TENANT_ID).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} materials", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let service = StudioService::new(db);
    let admin = Capabilities::new("seed", DEFAULT_TENANT_ID, vec![Role::Admin]);

    // Cost configuration
    let cost_config = TenantConfig {
        energy_per_h: Some(1.5),
        labor_per_h: Some(10.0),
        markup_material: Some(3.0),
        print_price_per_h: Some(25.0),
        base_fee: Some(5.0),
        min_order_price: Some(20.0),
        fortaleza_discount: Some(5.0),
        packaging_default: Some(2.0),
        ..TenantConfig::empty(DEFAULT_TENANT_ID)
    };
    service.save_cost_config(&admin, cost_config).await?;
    println!("✓ Cost configuration saved");

    // Materials
    let mut materials = Vec::with_capacity(MATERIALS.len());
    for (name, price_per_kg) in MATERIALS {
        let material = service
            .save_material(
                &admin,
                Material {
                    id: String::new(),
                    tenant_id: String::new(),
                    name: name.to_string(),
                    price_per_kg: *price_per_kg,
                    active: true,
                    created_at: Utc::now(),
                },
            )
            .await?;
        materials.push(material);
    }
    println!("✓ {} materials", materials.len());

    let id_of = |name: &str| {
        materials
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.id.clone())
    };

    // Catalog
    let products = [
        product("Vaso Decorativo", ProductCategory::Printing3d, id_of("PLA"), "Preto", 2.5, 150.0),
        product("Chaveiro Personalizado", ProductCategory::Printing3d, id_of("PETG"), "Azul", 0.5, 12.0),
        product("Placa Gravada", ProductCategory::Laser, id_of("MDF 3mm"), "Natural", 0.3, 80.0),
    ];
    let mut saved = Vec::with_capacity(products.len());
    for product in products {
        saved.push(service.save_product(&admin, product).await?);
    }
    let products = saved;
    println!("✓ {} products", products.len());

    // Clients
    let mut clients = Vec::with_capacity(CLIENTS.len());
    for (name, city, neighborhood, channel) in CLIENTS {
        let client = service
            .save_client(
                &admin,
                Client {
                    id: String::new(),
                    tenant_id: String::new(),
                    name: name.to_string(),
                    whatsapp: None,
                    city: Some(city.to_string()),
                    neighborhood: Some(neighborhood.to_string()),
                    channel: Some(channel.to_string()),
                    notes: None,
                    created_at: Utc::now(),
                },
            )
            .await?;
        clients.push(client);
    }
    println!("✓ {} clients", clients.len());

    // Stock rows, filled through inbound adjustments so the ledger matches
    for (material, color, min_g, bought_g) in STOCK {
        let Some(material_id) = id_of(*material) else {
            continue;
        };
        let row = service
            .create_stock_row(&admin, &material_id, color, Some(*min_g))
            .await?;
        service
            .adjust_stock(&admin, &row.id, AdjustmentDirection::Inbound, *bought_g, "Compra inicial")
            .await?;
    }
    println!("✓ {} stock rows", STOCK.len());

    // Orders
    let today = Utc::now().date_naive();
    let vase = OrderLineDraft {
        qty: 2,
        ..OrderLineDraft::from_product(&products[0])
    };
    let keychains = OrderLineDraft {
        qty: 10,
        ..OrderLineDraft::from_product(&products[1])
    };
    let sign = OrderLineDraft::from_product(&products[2]);

    let delivered = service
        .create_order(
            &admin,
            NewOrder {
                client_id: clients[0].id.clone(),
                order_date: today - Duration::days(3),
                status: Some(OrderStatus::Ready),
                payment_method: Some("pix".to_string()),
                delivery_method: Some("retirada".to_string()),
                city: Some("Fortaleza".to_string()),
                discount: 0.0,
                freight: 0.0,
                notes: None,
                lines: vec![vase, keychains],
            },
        )
        .await?;

    let quoted = service
        .create_order(
            &admin,
            NewOrder {
                client_id: clients[1].id.clone(),
                order_date: today,
                status: None,
                payment_method: None,
                delivery_method: Some("correios".to_string()),
                city: Some("Recife".to_string()),
                discount: 5.0,
                freight: 22.0,
                notes: Some("Gravar logo no canto".to_string()),
                lines: vec![sign],
            },
        )
        .await?;

    let change = service
        .change_status(&admin, &delivered.order.id, OrderStatus::Delivered)
        .await?;
    println!("✓ 2 orders");

    if let Some(report) = change.reconcile {
        println!(
            "  Delivery drew {} g over {} line(s), {} skipped, {} failed",
            -report.total_delta_g(),
            report.applied.len(),
            report.skipped.len(),
            report.failed.len()
        );
    }
    for (created, client) in [&delivered, &quoted].into_iter().zip(&clients) {
        if let Some(totals) = created.order.totals {
            println!(
                "  {}: {} (profit {}, margin {})",
                client.name,
                format_brl(totals.total_revenue),
                format_brl(totals.total_profit),
                format_percent(totals.margin)
            );
        }
    }

    let low = service.low_stock(&admin).await?;
    println!("  Low stock rows: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn product(
    name: &str,
    category: ProductCategory,
    default_material_id: Option<String>,
    color: &str,
    avg_time_h: f64,
    avg_weight_g: f64,
) -> Product {
    Product {
        id: String::new(),
        tenant_id: String::new(),
        name: name.to_string(),
        category,
        default_material_id,
        default_color: Some(color.to_string()),
        avg_time_h: Some(avg_time_h),
        avg_weight_g: Some(avg_weight_g),
        fixed_price: None,
        notes: None,
        created_at: Utc::now(),
    }
}
