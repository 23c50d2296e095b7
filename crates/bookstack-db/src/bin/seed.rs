//! Development seed data: fills an empty database with a small catalog.
//!
//! ```bash
//! cargo run -p bookstack-db --bin seed -- --db ./bookstack_dev.db --stock 25
//! ```

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use bookstack_core::Book;
use bookstack_db::{Database, DbConfig};

/// (category, [(title, author, price in cents)])
const SHELVES: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Fiction",
        &[
            ("Dune", "Frank Herbert", 1299),
            ("Hyperion", "Dan Simmons", 1199),
            ("The Left Hand of Darkness", "Ursula K. Le Guin", 1099),
            ("Neuromancer", "William Gibson", 999),
            ("A Canticle for Leibowitz", "Walter M. Miller Jr.", 1399),
            ("The Dispossessed", "Ursula K. Le Guin", 1149),
            ("Snow Crash", "Neal Stephenson", 1249),
            ("Roadside Picnic", "Arkady Strugatsky", 899),
        ],
    ),
    (
        "Programming",
        &[
            ("The Pragmatic Programmer", "Andrew Hunt", 3999),
            ("Structure and Interpretation of Computer Programs", "Harold Abelson", 4599),
            ("The C Programming Language", "Brian W. Kernighan", 4999),
            ("Designing Data-Intensive Applications", "Martin Kleppmann", 4299),
            ("Programming Rust", "Jim Blandy", 5299),
            ("Refactoring", "Martin Fowler", 4499),
        ],
    ),
    (
        "History",
        &[
            ("The Guns of August", "Barbara W. Tuchman", 1899),
            ("SPQR", "Mary Beard", 1799),
            ("A Distant Mirror", "Barbara W. Tuchman", 1999),
            ("The Silk Roads", "Peter Frankopan", 1699),
            ("Salt: A World History", "Mark Kurlansky", 1599),
        ],
    ),
];

const USAGE: &str = "\
Bookstack seed data

Usage: seed [--db <PATH>] [--stock <N>]

  --db <PATH>    database file (default ./bookstack_dev.db)
  --stock <N>    copies per title (default 20)";

struct SeedArgs {
    db_path: String,
    stock: i64,
}

fn parse_args() -> Result<SeedArgs, String> {
    let mut parsed = SeedArgs {
        db_path: "./bookstack_dev.db".to_string(),
        stock: 20,
    };

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--db" | "-d" => {
                parsed.db_path = args.next().ok_or("--db needs a value")?;
            }
            "--stock" | "-s" => {
                let value = args.next().ok_or("--stock needs a value")?;
                parsed.stock = value
                    .parse()
                    .map_err(|_| format!("--stock: not a number: {value}"))?;
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown flag: {other}")),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    info!(db = %args.db_path, stock = %args.stock, "Seeding bookstack database");

    let db = Database::new(DbConfig::new(&args.db_path)).await?;

    let existing = db.books().count_active().await?;
    if existing > 0 {
        info!(existing, "Database already has books; nothing to do");
        return Ok(());
    }

    let now = Utc::now();
    let mut books = Vec::new();
    for &(category, titles) in SHELVES {
        for &(title, author, price_cents) in titles {
            books.push(Book {
                id: Uuid::new_v4().to_string(),
                title: title.to_string(),
                author: author.to_string(),
                category: category.to_string(),
                price_cents,
                stock_quantity: args.stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            });
        }
    }

    let inserted = db.books().insert_many(&books).await?;
    info!(inserted, "Seed complete");

    Ok(())
}
