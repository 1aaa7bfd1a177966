//! Document store
//!
//! All persistence goes through the [`Store`] trait so the workflow and
//! analysis code never reach for a global handle. [`YamlStore`] keeps one
//! YAML file per document under a project directory; [`MemoryStore`] keeps
//! everything in maps and is used by tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::core::entity::{validate_key, Document};
use crate::entities::{
    Batch, Machine, MeasurementRecord, Operator, Product, QueuedBatch, TestType,
};
use crate::yaml::{parse_yaml_file, write_yaml_file, YamlError};

/// Extension used for every document file
pub const DOC_EXTENSION: &str = "yaml";

/// File holding the operator roster
const OPERATORS_FILE: &str = "operators.yaml";

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("{kind} '{key}' not found")]
    #[diagnostic(code(coilqc::store::not_found))]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} '{key}' already exists")]
    #[diagnostic(code(coilqc::store::exists))]
    AlreadyExists { kind: &'static str, key: String },

    #[error("Invalid {kind} key: {reason}")]
    #[diagnostic(
        code(coilqc::store::invalid_key),
        help("Use letters, digits, '-', '_' or '.'")
    )]
    InvalidKey { kind: &'static str, reason: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Yaml(#[from] YamlError),

    #[error("IO error: {0}")]
    #[diagnostic(code(coilqc::store::io))]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Filter for measurement queries; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct MeasurementQuery {
    pub sku: Option<String>,
    pub batch: Option<String>,
    pub test_type: Option<TestType>,
}

impl MeasurementQuery {
    pub fn for_sku(sku: &str) -> Self {
        Self {
            sku: Some(sku.to_string()),
            ..Default::default()
        }
    }

    pub fn for_batch(batch: &str) -> Self {
        Self {
            batch: Some(batch.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &MeasurementRecord) -> bool {
        self.sku.as_ref().map_or(true, |s| &record.sku == s)
            && self.batch.as_ref().map_or(true, |b| &record.batch == b)
            && self.test_type.map_or(true, |t| record.test_type == t)
    }
}

/// Data access used by the batch workflow and QC analysis
///
/// List methods return documents sorted by key, except measurements which
/// come back in creation order.
pub trait Store {
    fn product(&self, sku: &str) -> StoreResult<Option<Product>>;
    fn products(&self) -> StoreResult<Vec<Product>>;
    fn save_product(&mut self, product: &Product) -> StoreResult<()>;

    fn machine(&self, name: &str) -> StoreResult<Option<Machine>>;
    fn machines(&self) -> StoreResult<Vec<Machine>>;
    fn save_machine(&mut self, machine: &Machine) -> StoreResult<()>;

    fn batch(&self, batch_number: &str) -> StoreResult<Option<Batch>>;
    fn batches(&self) -> StoreResult<Vec<Batch>>;
    fn save_batch(&mut self, batch: &Batch) -> StoreResult<()>;

    fn add_measurement(&mut self, record: &MeasurementRecord) -> StoreResult<()>;
    /// Matching records in creation order
    fn measurements(&self, query: &MeasurementQuery) -> StoreResult<Vec<MeasurementRecord>>;

    fn queued(&self, batch_number: &str) -> StoreResult<Option<QueuedBatch>>;
    fn queue(&self) -> StoreResult<Vec<QueuedBatch>>;
    fn save_queued(&mut self, entry: &QueuedBatch) -> StoreResult<()>;
    /// Returns false if there was nothing to remove
    fn remove_queued(&mut self, batch_number: &str) -> StoreResult<bool>;

    fn operators(&self) -> StoreResult<Vec<Operator>>;
    fn save_operators(&mut self, operators: &[Operator]) -> StoreResult<()>;

    /// Fetch a product or fail with `NotFound`
    fn require_product(&self, sku: &str) -> StoreResult<Product> {
        self.product(sku)?.ok_or_else(|| StoreError::NotFound {
            kind: Product::KIND,
            key: sku.to_string(),
        })
    }

    fn require_machine(&self, name: &str) -> StoreResult<Machine> {
        self.machine(name)?.ok_or_else(|| StoreError::NotFound {
            kind: Machine::KIND,
            key: name.to_string(),
        })
    }

    fn require_batch(&self, batch_number: &str) -> StoreResult<Batch> {
        self.batch(batch_number)?.ok_or_else(|| StoreError::NotFound {
            kind: Batch::KIND,
            key: batch_number.to_string(),
        })
    }
}

fn check_key<T: Document>(key: &str) -> StoreResult<()> {
    validate_key(key).map_err(|reason| StoreError::InvalidKey {
        kind: T::KIND,
        reason,
    })
}

// =========================================================================
// YAML file store
// =========================================================================

/// One YAML file per document under `root/<collection>/<key>.yaml`
#[derive(Debug, Clone)]
pub struct YamlStore {
    root: PathBuf,
}

impl YamlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create every collection directory
    pub fn create_layout(&self) -> StoreResult<()> {
        for dir in [
            Product::COLLECTION,
            Machine::COLLECTION,
            Batch::COLLECTION,
            MeasurementRecord::COLLECTION,
            QueuedBatch::COLLECTION,
        ] {
            fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    fn doc_path<T: Document>(&self, key: &str) -> PathBuf {
        self.root
            .join(T::COLLECTION)
            .join(format!("{}.{}", key, DOC_EXTENSION))
    }

    fn read_doc<T: Document>(&self, key: &str) -> StoreResult<Option<T>> {
        check_key::<T>(key)?;
        let path = self.doc_path::<T>(key);
        if !path.exists() {
            return Ok(None);
        }
        debug!(kind = T::KIND, key, path = %path.display(), "reading document");
        Ok(Some(parse_yaml_file(&path)?))
    }

    fn write_doc<T: Document>(&self, doc: &T) -> StoreResult<()> {
        check_key::<T>(doc.key())?;
        let path = self.doc_path::<T>(doc.key());
        debug!(kind = T::KIND, key = doc.key(), path = %path.display(), "writing document");
        write_yaml_file(&path, doc)?;
        Ok(())
    }

    fn list_docs<T: Document>(&self) -> StoreResult<Vec<T>> {
        let dir = self.root.join(T::COLLECTION);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|e| e == DOC_EXTENSION))
            .collect();
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            docs.push(parse_yaml_file(&path)?);
        }
        debug!(kind = T::KIND, count = docs.len(), "listed documents");
        Ok(docs)
    }
}

impl Store for YamlStore {
    fn product(&self, sku: &str) -> StoreResult<Option<Product>> {
        self.read_doc(sku)
    }

    fn products(&self) -> StoreResult<Vec<Product>> {
        self.list_docs()
    }

    fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        self.write_doc(product)
    }

    fn machine(&self, name: &str) -> StoreResult<Option<Machine>> {
        self.read_doc(name)
    }

    fn machines(&self) -> StoreResult<Vec<Machine>> {
        self.list_docs()
    }

    fn save_machine(&mut self, machine: &Machine) -> StoreResult<()> {
        self.write_doc(machine)
    }

    fn batch(&self, batch_number: &str) -> StoreResult<Option<Batch>> {
        self.read_doc(batch_number)
    }

    fn batches(&self) -> StoreResult<Vec<Batch>> {
        self.list_docs()
    }

    fn save_batch(&mut self, batch: &Batch) -> StoreResult<()> {
        self.write_doc(batch)
    }

    fn add_measurement(&mut self, record: &MeasurementRecord) -> StoreResult<()> {
        if self.doc_path::<MeasurementRecord>(&record.id).exists() {
            return Err(StoreError::AlreadyExists {
                kind: MeasurementRecord::KIND,
                key: record.id.clone(),
            });
        }
        self.write_doc(record)
    }

    fn measurements(&self, query: &MeasurementQuery) -> StoreResult<Vec<MeasurementRecord>> {
        let all: Vec<MeasurementRecord> = self.list_docs()?;
        let mut matched: Vec<MeasurementRecord> =
            all.into_iter().filter(|m| query.matches(m)).collect();
        sort_by_creation(&mut matched);
        Ok(matched)
    }

    fn queued(&self, batch_number: &str) -> StoreResult<Option<QueuedBatch>> {
        self.read_doc(batch_number)
    }

    fn queue(&self) -> StoreResult<Vec<QueuedBatch>> {
        self.list_docs()
    }

    fn save_queued(&mut self, entry: &QueuedBatch) -> StoreResult<()> {
        self.write_doc(entry)
    }

    fn remove_queued(&mut self, batch_number: &str) -> StoreResult<bool> {
        check_key::<QueuedBatch>(batch_number)?;
        let path = self.doc_path::<QueuedBatch>(batch_number);
        if !path.exists() {
            return Ok(false);
        }
        debug!(key = batch_number, "removing queued batch");
        fs::remove_file(path)?;
        Ok(true)
    }

    fn operators(&self) -> StoreResult<Vec<Operator>> {
        let path = self.root.join(OPERATORS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(parse_yaml_file(&path)?)
    }

    fn save_operators(&mut self, operators: &[Operator]) -> StoreResult<()> {
        write_yaml_file(&self.root.join(OPERATORS_FILE), &operators)?;
        Ok(())
    }
}

/// Ids from the same millisecond are not ordered, so sort on the timestamp
fn sort_by_creation(records: &mut [MeasurementRecord]) {
    records.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
}

// =========================================================================
// In-memory store
// =========================================================================

/// Map-backed store for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    products: BTreeMap<String, Product>,
    machines: BTreeMap<String, Machine>,
    batches: BTreeMap<String, Batch>,
    measurements: Vec<MeasurementRecord>,
    queue: BTreeMap<String, QueuedBatch>,
    operators: Vec<Operator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn product(&self, sku: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.get(sku).cloned())
    }

    fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products.values().cloned().collect())
    }

    fn save_product(&mut self, product: &Product) -> StoreResult<()> {
        check_key::<Product>(&product.sku)?;
        self.products.insert(product.sku.clone(), product.clone());
        Ok(())
    }

    fn machine(&self, name: &str) -> StoreResult<Option<Machine>> {
        Ok(self.machines.get(name).cloned())
    }

    fn machines(&self) -> StoreResult<Vec<Machine>> {
        Ok(self.machines.values().cloned().collect())
    }

    fn save_machine(&mut self, machine: &Machine) -> StoreResult<()> {
        check_key::<Machine>(&machine.name)?;
        self.machines.insert(machine.name.clone(), machine.clone());
        Ok(())
    }

    fn batch(&self, batch_number: &str) -> StoreResult<Option<Batch>> {
        Ok(self.batches.get(batch_number).cloned())
    }

    fn batches(&self) -> StoreResult<Vec<Batch>> {
        Ok(self.batches.values().cloned().collect())
    }

    fn save_batch(&mut self, batch: &Batch) -> StoreResult<()> {
        check_key::<Batch>(&batch.batch_number)?;
        self.batches.insert(batch.batch_number.clone(), batch.clone());
        Ok(())
    }

    fn add_measurement(&mut self, record: &MeasurementRecord) -> StoreResult<()> {
        if self.measurements.iter().any(|m| m.id == record.id) {
            return Err(StoreError::AlreadyExists {
                kind: MeasurementRecord::KIND,
                key: record.id.clone(),
            });
        }
        self.measurements.push(record.clone());
        Ok(())
    }

    fn measurements(&self, query: &MeasurementQuery) -> StoreResult<Vec<MeasurementRecord>> {
        let mut matched: Vec<MeasurementRecord> = self
            .measurements
            .iter()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        sort_by_creation(&mut matched);
        Ok(matched)
    }

    fn queued(&self, batch_number: &str) -> StoreResult<Option<QueuedBatch>> {
        Ok(self.queue.get(batch_number).cloned())
    }

    fn queue(&self) -> StoreResult<Vec<QueuedBatch>> {
        Ok(self.queue.values().cloned().collect())
    }

    fn save_queued(&mut self, entry: &QueuedBatch) -> StoreResult<()> {
        check_key::<QueuedBatch>(&entry.batch_number)?;
        self.queue.insert(entry.batch_number.clone(), entry.clone());
        Ok(())
    }

    fn remove_queued(&mut self, batch_number: &str) -> StoreResult<bool> {
        Ok(self.queue.remove(batch_number).is_some())
    }

    fn operators(&self) -> StoreResult<Vec<Operator>> {
        Ok(self.operators.clone())
    }

    fn save_operators(&mut self, operators: &[Operator]) -> StoreResult<()> {
        self.operators = operators.to_vec();
        Ok(())
    }
}
