//! # Seed Data Generator
//!
//! Creates a small demo catalog and runs a scripted cart session through
//! `CartEngine`, for development.
//!
//! ## Usage
//! ```bash
//! # Use shopcart.toml / SHOPCART_* settings
//! cargo run -p shopcart-db --bin seed
//!
//! # Explicit config file and database path
//! cargo run -p shopcart-db --bin seed -- --config ./shopcart.toml --db ./shopcart_dev.db
//! ```

use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

use shopcart_core::catalog::{NewProduct, PageRequest};
use shopcart_core::comment::NewComment;
use shopcart_core::{CartAction, CartLineRequest};
use shopcart_db::{Database, DbConfig};
use shopcart_engine::{init_tracing, CartEngine, ShopConfig};

/// Demo catalog: (title, description, category, price_cents, discount_bps, stock)
const CATALOG: &[(&str, &str, &str, i64, u32, i64)] = &[
    ("Canvas Sneakers", "Low-top canvas sneakers with rubber sole", "Shoes", 5_999, 1_000, 25),
    ("Linen Shirt", "Breathable linen shirt for warm days", "Clothing", 3_450, 0, 40),
    ("Desk Lamp", "Warm LED desk lamp with dimmer", "Home", 10_000, 1_000, 3),
    ("Water Bottle", "Insulated steel bottle, 750 ml", "Outdoor", 2_199, 2_500, 60),
    ("Wireless Mouse", "Quiet wireless mouse with USB receiver", "Electronics", 1_899, 0, 15),
];

const DEMO_OWNER: &str = "demo-user";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct SeedArgs {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    help: bool,
    /// Logged once tracing is initialized.
    unknown: Vec<String>,
}

fn parse_args(args: &[String]) -> SeedArgs {
    let mut parsed = SeedArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    parsed.db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => parsed.help = true,
            other => parsed.unknown.push(other.to_string()),
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!("Shopcart Seed Data Generator");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Config file (default: platform config dir)");
    println!("  -d, --db <PATH>      Database file path (overrides config)");
    println!("  -h, --help           Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let SeedArgs {
        config_path,
        db_path,
        help,
        unknown,
    } = parse_args(&args);

    if help {
        print_help();
        return Ok(());
    }

    let mut config = ShopConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    init_tracing(&config.logging);

    for arg in &unknown {
        warn!(arg = %arg, "Ignoring unknown argument");
    }

    let db = Database::new(DbConfig::from_settings(&config.database)?).await?;
    info!("Connected to database, migrations applied");

    // Catalog
    let products = db.products();
    let mut ids = Vec::new();
    if products.count().await? > 0 {
        warn!("Catalog already seeded, reusing existing products");
        for (title, description, category, ..) in CATALOG {
            let slug = shopcart_core::catalog::generate_slug(title, description, category);
            if let Some(product) = products.get_by_slug(&slug).await? {
                ids.push(product.id);
            }
        }
    } else {
        for (title, description, category, price_cents, discount_bps, stock) in CATALOG {
            let product = products
                .insert(NewProduct {
                    title: title.to_string(),
                    description: description.to_string(),
                    categories: vec![category.to_string()],
                    slug: None,
                    price_cents: *price_cents,
                    discount_bps: *discount_bps,
                    stock: *stock,
                    images: vec![format!("https://img.shopcart.dev/{}.jpg", title.to_lowercase().replace(' ', "-"))],
                })
                .await?;
            info!(id = %product.id, slug = %product.slug, "Created product");
            ids.push(product.id);
        }
    }

    for product in products.list(PageRequest::default()).await? {
        info!(slug = %product.slug, price = %product.effective_unit_price(), "Listed product");
    }

    if ids.len() < 3 {
        warn!("Demo catalog incomplete, skipping cart session");
        return Ok(());
    }

    let comment = db
        .comments()
        .add(&ids[0], NewComment::new(DEMO_OWNER, "Comfortable right out of the box"))
        .await;
    match comment {
        Ok(comment) => info!(id = %comment.id, product_id = %comment.product_id, "Added comment"),
        Err(e) => warn!(error = %e, "Could not add demo comment"),
    }

    // Scripted cart session
    let engine = CartEngine::new(db.carts(), config.engine.clone());

    let sneakers_red = CartLineRequest::new(ids[0].clone(), 2).color("red").model("42");
    let sneakers_white = CartLineRequest::new(ids[0].clone(), 1).color("white").model("42");
    let shirt = CartLineRequest::new(ids[1].clone(), 1).color("blue");
    let lamp = CartLineRequest::new(ids[2].clone(), 5).color("black");

    engine.add_to_cart(DEMO_OWNER, &sneakers_red).await?;
    engine.add_to_cart(DEMO_OWNER, &sneakers_white).await?;
    engine.add_to_cart(DEMO_OWNER, &shirt).await?;
    engine
        .update_cart_item(DEMO_OWNER, &sneakers_red, CartAction::Increment)
        .await?;
    engine
        .update_cart_item(DEMO_OWNER, &shirt, CartAction::Decrement)
        .await?;

    if let Err(e) = engine.add_to_cart(DEMO_OWNER, &lamp).await {
        info!(error = %e, "Lamp rejected as expected");
    }

    let cart = engine.get_cart(DEMO_OWNER).await?;
    for line in &cart.lines {
        info!(
            line_id = %line.id,
            title = %line.title,
            color = %line.color,
            model = %line.model,
            quantity = line.quantity,
            unit_price = %line.unit_price(),
            line_total = %line.line_total(),
            "Cart line"
        );
    }
    info!(
        owner_id = %cart.owner_id,
        lines = cart.line_count(),
        total = %cart.total(),
        version = cart.version,
        "Demo cart ready"
    );

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("seed")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args_keeps_unknown_for_later() {
        let parsed = parse_args(&argv(&["--verbose", "-d", "dev.db", "extra"]));

        assert_eq!(parsed.db_path, Some(PathBuf::from("dev.db")));
        assert_eq!(parsed.config_path, None);
        assert!(!parsed.help);
        assert_eq!(parsed.unknown, vec!["--verbose".to_string(), "extra".to_string()]);
    }

    #[test]
    fn test_parse_args_flags() {
        let parsed = parse_args(&argv(&["-c", "shop.toml", "--help"]));
        assert_eq!(parsed.config_path, Some(PathBuf::from("shop.toml")));
        assert!(parsed.help);
        assert!(parsed.unknown.is_empty());

        assert_eq!(parse_args(&argv(&[])), SeedArgs::default());
    }
}
