//! Drug-type catalog.
//!
//! The catalog is a fixed list of ATC classes. It is upserted on every start so that a fresh database is usable
//! immediately and an existing one picks up renamed classes.
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::QueryOrder;
use tracing::info;
use tracing::instrument;

use crate::db::entity::drug_type;
use crate::db::prelude::*;
use crate::types::Result;

/// `(code, name)` pairs of the known drug classes.
pub const DRUG_TYPES: [(&str, &str); 8] = [
    (
        "M01AB",
        "Anti-inflammatory and antirheumatic products (Acetic acid derivatives)",
    ),
    (
        "M01AE",
        "Anti-inflammatory and antirheumatic products (Propionic acid derivatives)",
    ),
    ("N02BA", "Other analgesics and antipyretics (Salicylic acid derivatives)"),
    ("N02BE/B", "Other analgesics and antipyretics (Pyrazolones and Anilides)"),
    ("N05B", "Psycholeptics drugs (Anxiolytic)"),
    ("N05C", "Psycholeptics drugs (Hypnotics and sedatives)"),
    ("R03", "Drugs for obstructive airway diseases"),
    ("R06", "Antihistamines for systemic use"),
];

#[instrument(level = "debug", skip(db))]
pub async fn seed_drug_types(db: &impl ConnectionTrait) -> Result<()> {
    let models = DRUG_TYPES.iter().map(|(code, name)| drug_type::ActiveModel {
        code:        Set((*code).to_owned()),
        name:        Set((*name).to_owned()),
        description: Set(None),
    });

    DrugTypes::insert_many(models)
        .on_conflict(
            OnConflict::column(drug_type::Column::Code)
                .update_column(drug_type::Column::Name)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!("Drug types initialized successfully");
    Ok(())
}

pub async fn list_drug_types(db: &impl ConnectionTrait) -> Result<Vec<DrugType>> {
    Ok(DrugTypes::find()
        .order_by_asc(drug_type::Column::Code)
        .all(db)
        .await?)
}

/// Look a drug type up by its human-readable name, which is what the inventory form submits.
pub async fn find_by_name(db: &impl ConnectionTrait, name: &str) -> Result<Option<DrugType>> {
    Ok(DrugTypes::find()
        .filter(drug_type::Column::Name.eq(name))
        .one(db)
        .await?)
}

pub async fn find_by_code(db: &impl ConnectionTrait, code: &str) -> Result<Option<DrugType>> {
    Ok(DrugTypes::find_by_id(code.to_owned()).one(db).await?)
}
