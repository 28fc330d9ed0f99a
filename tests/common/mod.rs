#![allow(dead_code)]

use std::sync::Arc;

use pharma_ledger::app;
use pharma_ledger::catalog::DRUG_TYPES;
use pharma_ledger::db::driver::sqlite::Sqlite;
use pharma_ledger::inventory::InventoryItem;
use pharma_ledger::inventory::NewStock;
use pharma_ledger::Inventory;
use pharma_ledger::Ledger;
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub struct Fixture {
    // Keeps the database directory alive for the duration of the test.
    pub tempdir:   TempDir,
    pub db:        Arc<Sqlite>,
    pub ledger:    Ledger<Sqlite>,
    pub inventory: Inventory<Sqlite>,
}

pub async fn fixture() -> Result<Fixture, Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let db = Arc::new(Sqlite::connect(tempdir.path(), "test.db").await?);
    app::prepare_db(db.as_ref()).await?;

    let ledger = Ledger::builder().db(Arc::clone(&db)).build()?;
    let inventory = Inventory::builder().db(Arc::clone(&db)).build()?;

    Ok(Fixture {
        tempdir,
        db,
        ledger,
        inventory,
    })
}

/// Name of the "Pyrazolones and Anilides" analgesics class.
pub fn analgesics() -> String {
    DRUG_TYPES[3].1.to_string()
}

pub fn stock_request(name: &str, supplier: &str, quantity: i64) -> NewStock {
    NewStock {
        drug_name:    Some(name.to_string()),
        drug_type:    Some(analgesics()),
        quantity:     Some(quantity),
        price:        Some(10.0),
        supplier:     Some(supplier.to_string()),
        expiry_date:  Some("2099-12-31".to_string()),
        batch_number: Some("B-001".to_string()),
        description:  None,
    }
}

impl Fixture {
    pub async fn stock(&self, name: &str, quantity: i64) -> InventoryItem {
        self.inventory
            .stock_drug(&stock_request(name, "Acme Pharma", quantity))
            .await
            .expect("stocking a drug")
            .item()
            .clone()
    }

    pub async fn item(&self, name: &str) -> InventoryItem {
        self.inventory
            .list_inventory()
            .await
            .expect("listing inventory")
            .into_iter()
            .find(|i| i.drug_name == name)
            .unwrap_or_else(|| panic!("no '{name}' in inventory"))
    }
}
