//! Xref database access
//!
//! Reads the source and species lookups a run needs and loads xref nodes
//! into the xref schema. Each batch is written in its own transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};
use xref_common::types::{DependentXref, DirectXref, XrefNode};

use crate::config::DatabaseConfig;
use crate::loader::XrefLoader;
use crate::uniprot::models::{SourceFamily, SourceIdMap, SourcePriority, TaxonomyMap};

/// `xref.info_type` for sequence-matched primary xrefs
const SEQUENCE_MATCH: &str = "SEQUENCE_MATCH";

/// `xref.info_type` for xrefs attached through a master xref
const DEPENDENT: &str = "DEPENDENT";

/// Connection to an xref database
#[derive(Clone)]
pub struct XrefDatabase {
    pool: MySqlPool,
}

impl XrefDatabase {
    /// Open a connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "Connecting to xref database");

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .context("Failed to connect to xref database")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Load the UniProt source IDs keyed by family and priority description
    ///
    /// Rows with a priority description this pipeline does not use are ignored.
    pub async fn source_id_map(&self) -> Result<SourceIdMap> {
        let mut map = SourceIdMap::new();

        for family in SourceFamily::ALL {
            let rows = sqlx::query_as::<_, (u32, String)>(
                "SELECT source_id, priority_description FROM source WHERE name = ?",
            )
            .bind(family.name())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load sources for {}", family))?;

            for (source_id, description) in rows {
                match description.parse::<SourcePriority>() {
                    Ok(priority) => map.insert(family, priority, source_id),
                    Err(_) => debug!(
                        family = %family,
                        source_id,
                        priority = %description,
                        "Ignoring source with unused priority"
                    ),
                }
            }
        }

        if map.is_empty() {
            warn!("No UniProt sources found in the source table");
        }

        Ok(map)
    }

    /// Load the NCBI taxonomy IDs registered for a species
    pub async fn taxonomy_map(&self, species_id: u32) -> Result<TaxonomyMap> {
        let taxonomy_ids = sqlx::query_scalar::<_, u32>(
            "SELECT taxonomy_id FROM species WHERE species_id = ?",
        )
        .bind(species_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load taxonomy IDs for species {}", species_id))?;

        debug!(species_id, count = taxonomy_ids.len(), "Loaded taxonomy IDs");
        Ok(TaxonomyMap::for_species(species_id, taxonomy_ids))
    }

    /// Insert one node with its sequence, synonyms and attached xrefs
    async fn insert_node(tx: &mut Transaction<'_, MySql>, node: &XrefNode) -> Result<u64> {
        let xref_id = sqlx::query(
            r#"
            INSERT INTO xref (accession, version, label, description, source_id, species_id, info_type)
            VALUES (?, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node.accession)
        .bind(&node.label)
        .bind(&node.description)
        .bind(node.source_id)
        .bind(node.species_id)
        .bind(SEQUENCE_MATCH)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to insert xref {}", node.accession))?
        .last_insert_id();

        sqlx::query(
            "INSERT INTO primary_xref (xref_id, sequence, sequence_type, status) VALUES (?, ?, ?, ?)",
        )
        .bind(xref_id)
        .bind(&node.sequence)
        .bind(node.sequence_type.as_str())
        .bind(node.status.as_str())
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to insert primary_xref for {}", node.accession))?;

        Self::insert_synonyms(tx, xref_id, &node.synonyms).await?;

        for dependent in &node.dependent_xrefs {
            Self::insert_dependent(tx, xref_id, node.species_id, dependent).await?;
        }

        for direct in &node.direct_xrefs {
            Self::insert_direct(tx, xref_id, direct).await?;
        }

        Ok(xref_id)
    }

    async fn insert_synonyms(
        tx: &mut Transaction<'_, MySql>,
        xref_id: u64,
        synonyms: &[String],
    ) -> Result<()> {
        for synonym in synonyms {
            sqlx::query("INSERT IGNORE INTO synonym (xref_id, synonym) VALUES (?, ?)")
                .bind(xref_id)
                .bind(synonym)
                .execute(&mut **tx)
                .await
                .context("Failed to insert synonym")?;
        }
        Ok(())
    }

    async fn insert_dependent(
        tx: &mut Transaction<'_, MySql>,
        master_xref_id: u64,
        species_id: u32,
        dependent: &DependentXref,
    ) -> Result<()> {
        let label = dependent.label.as_deref().unwrap_or(&dependent.accession);

        let dependent_xref_id = sqlx::query(
            r#"
            INSERT INTO xref (accession, version, label, description, source_id, species_id, info_type)
            VALUES (?, 0, ?, '', ?, ?, ?)
            "#,
        )
        .bind(&dependent.accession)
        .bind(label)
        .bind(dependent.source_id)
        .bind(species_id)
        .bind(DEPENDENT)
        .execute(&mut **tx)
        .await
        .with_context(|| {
            format!(
                "Failed to insert {} dependent xref {}",
                dependent.source_name, dependent.accession
            )
        })?
        .last_insert_id();

        sqlx::query(
            r#"
            INSERT INTO dependent_xref (master_xref_id, dependent_xref_id, linkage_source_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(master_xref_id)
        .bind(dependent_xref_id)
        .bind(dependent.linkage_source_id)
        .execute(&mut **tx)
        .await
        .context("Failed to insert dependent_xref")?;

        Self::insert_synonyms(tx, dependent_xref_id, &dependent.synonyms).await
    }

    async fn insert_direct(
        tx: &mut Transaction<'_, MySql>,
        xref_id: u64,
        direct: &DirectXref,
    ) -> Result<()> {
        let table = direct.feature_type.direct_xref_table();
        let sql = format!(
            "INSERT INTO {} (general_xref_id, ensembl_stable_id, linkage_xref) VALUES (?, ?, ?)",
            table
        );

        sqlx::query(&sql)
            .bind(xref_id)
            .bind(&direct.stable_id)
            .bind(direct.linkage_type.as_str())
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to insert {} for {}", table, direct.stable_id))?;

        debug!(xref_id, stable_id = %direct.stable_id, table, "Inserted direct xref");
        Ok(())
    }
}

#[async_trait]
impl XrefLoader for XrefDatabase {
    async fn load_batch(&mut self, batch: Vec<XrefNode>) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for node in &batch {
            Self::insert_node(&mut tx, node).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;

        debug!(count = batch.len(), "Committed xref batch");
        Ok(batch.len())
    }

    async fn set_release(&mut self, source_id: u32, release: &str) -> Result<()> {
        let result = sqlx::query("UPDATE source SET source_release = ? WHERE source_id = ?")
            .bind(release)
            .bind(source_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to set release for source {}", source_id))?;

        if result.rows_affected() == 0 {
            warn!(source_id, "Release not recorded, source row missing or unchanged");
        } else {
            info!(source_id, release, "Recorded source release");
        }
        Ok(())
    }
}
