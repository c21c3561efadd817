//! Development seed data: an admin, demo pharmacies and patients, a drug
//! catalog and priced stock listings. Safe to re-run; every insert upserts.

use sqlx::PgPool;
use uuid::Uuid;

use pharmamart::auth;
use pharmamart::db;
use pharmamart::db::models::Role;
use pharmamart::utils::format_cents;

struct SeedAccount {
    email: &'static str,
    password: &'static str,
    role: Role,
    name: &'static str,
    phone: &'static str,
    address: &'static str,
}

struct SeedDrug {
    name: &'static str,
    category: &'static str,
    description: &'static str,
    base_price_cents: i64,
    stock: i32,
}

fn seed_accounts() -> Vec<SeedAccount> {
    vec![
        SeedAccount {
            email: "admin@pharmamart.test",
            password: "admin-password",
            role: Role::Admin,
            name: "Administrator",
            phone: "",
            address: "",
        },
        SeedAccount {
            email: "central@pharmamart.test",
            password: "pharmacy-password",
            role: Role::Pharmacy,
            name: "Central Pharmacy",
            phone: "+1-555-0101",
            address: "12 Main St",
        },
        SeedAccount {
            email: "riverside@pharmamart.test",
            password: "pharmacy-password",
            role: Role::Pharmacy,
            name: "Riverside Pharmacy",
            phone: "+1-555-0102",
            address: "88 River Rd",
        },
        SeedAccount {
            email: "jane@pharmamart.test",
            password: "patient-password",
            role: Role::Patient,
            name: "Jane Doe",
            phone: "+1-555-0201",
            address: "4 Elm St",
        },
        SeedAccount {
            email: "omar@pharmamart.test",
            password: "patient-password",
            role: Role::Patient,
            name: "Omar Hassan",
            phone: "+1-555-0202",
            address: "17 Oak Ave",
        },
    ]
}

fn seed_drugs() -> Vec<SeedDrug> {
    vec![
        SeedDrug {
            name: "Aspirin",
            category: "Analgesic",
            description: "Pain relief and fever reduction",
            base_price_cents: 499,
            stock: 500,
        },
        SeedDrug {
            name: "Amoxicillin",
            category: "Antibiotic",
            description: "Broad-spectrum penicillin antibiotic",
            base_price_cents: 1250,
            stock: 300,
        },
        SeedDrug {
            name: "Lisinopril",
            category: "ACE inhibitor",
            description: "Blood pressure management",
            base_price_cents: 899,
            stock: 400,
        },
        SeedDrug {
            name: "Levothyroxine",
            category: "Hormone",
            description: "Thyroid hormone replacement",
            base_price_cents: 1399,
            stock: 250,
        },
        SeedDrug {
            name: "Metformin",
            category: "Antidiabetic",
            description: "Type 2 diabetes management",
            base_price_cents: 749,
            stock: 350,
        },
        SeedDrug {
            name: "Amlodipine",
            category: "Calcium channel blocker",
            description: "Hypertension and angina",
            base_price_cents: 649,
            stock: 200,
        },
        SeedDrug {
            name: "Omeprazole",
            category: "Proton pump inhibitor",
            description: "Acid reflux and ulcers",
            base_price_cents: 999,
            stock: 450,
        },
        SeedDrug {
            name: "Albuterol",
            category: "Bronchodilator",
            description: "Asthma relief inhaler",
            base_price_cents: 2499,
            stock: 150,
        },
        SeedDrug {
            name: "Gabapentin",
            category: "Anticonvulsant",
            description: "Nerve pain and seizures",
            base_price_cents: 1149,
            stock: 300,
        },
        SeedDrug {
            name: "Metoprolol",
            category: "Beta blocker",
            description: "Heart rate and blood pressure",
            base_price_cents: 799,
            stock: 275,
        },
    ]
}

async fn upsert_account(pool: &PgPool, seed: &SeedAccount) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
    let password_hash = auth::hash_password(seed.password)?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO accounts (id, email, password_hash, role) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(seed.email)
    .bind(&password_hash)
    .bind(seed.role.as_str())
    .fetch_one(pool)
    .await?;

    match seed.role {
        Role::Patient => {
            sqlx::query(
                "INSERT INTO patients (account_id, full_name, phone, address) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (account_id) DO UPDATE SET full_name = EXCLUDED.full_name",
            )
            .bind(id)
            .bind(seed.name)
            .bind(seed.phone)
            .bind(seed.address)
            .execute(pool)
            .await?;
        }
        Role::Pharmacy => {
            sqlx::query(
                "INSERT INTO pharmacies (account_id, name, phone, address) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (account_id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(id)
            .bind(seed.name)
            .bind(seed.phone)
            .bind(seed.address)
            .execute(pool)
            .await?;
        }
        Role::Admin => {}
    }

    Ok(id)
}

pub async fn seed_database(pool: &PgPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut pharmacy_ids = Vec::new();
    for account in seed_accounts() {
        let id = upsert_account(pool, &account).await?;
        if account.role == Role::Pharmacy {
            pharmacy_ids.push(id);
        }
        println!("account {:<28} role {:<9} password {}", account.email, account.role.as_str(), account.password);
    }

    for drug in seed_drugs() {
        let drug_id: Uuid = sqlx::query_scalar(
            "INSERT INTO drugs (id, name, description, category) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description, \
                                              category = EXCLUDED.category \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(drug.name)
        .bind(drug.description)
        .bind(drug.category)
        .fetch_one(pool)
        .await?;

        // Each pharmacy lists every drug with a small price spread.
        for (i, pharmacy_id) in pharmacy_ids.iter().enumerate() {
            let price_cents = drug.base_price_cents + (i as i64) * 50;
            sqlx::query(
                "INSERT INTO pharmacy_products (pharmacy_id, drug_id, price_cents, quantity_available) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (pharmacy_id, drug_id) \
                 DO UPDATE SET price_cents = EXCLUDED.price_cents, \
                               quantity_available = EXCLUDED.quantity_available",
            )
            .bind(pharmacy_id)
            .bind(drug_id)
            .bind(price_cents)
            .bind(drug.stock)
            .execute(pool)
            .await?;
        }

        println!(
            "drug {:<16} from {} ({} units per pharmacy)",
            drug.name,
            format_cents(drug.base_price_cents),
            drug.stock
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;
    let pool = db::init_db(&database_url).await?;
    seed_database(&pool).await?;
    println!("Seed complete");
    Ok(())
}
