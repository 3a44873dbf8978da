//! Listing document service
//!
//! Loads listing JSON documents through the filesystem boundary, binds them
//! to the listing form and reports the settled state.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::application::edit::Edit;
use crate::application::listing::{listing_shape, Listing};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{ErrorTree, Form, Snapshot};
use crate::infrastructure::traits::FileSystem;

/// Outcome of checking or editing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingReport {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorTree>,
    pub valid: bool,
    /// Number of edits applied (0 for a plain check)
    pub edits: usize,
}

impl ListingReport {
    fn from_snapshot(snapshot: Snapshot, edits: usize) -> Self {
        Self {
            value: snapshot.value,
            errors: snapshot.errors,
            valid: snapshot.valid,
            edits,
        }
    }
}

/// Service for listing documents.
pub struct ListingService {
    fs: Arc<dyn FileSystem>,
}

impl ListingService {
    /// Create a new listing service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read a document as JSON.
    pub fn read(&self, path: &Path) -> ApplicationResult<Value> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::Parse {
                path: path.to_path_buf(),
                message: "file not found".into(),
            });
        }
        if !self.fs.is_file(path) {
            return Err(ApplicationError::Parse {
                path: path.to_path_buf(),
                message: "not a regular file".into(),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read listing", path)?;
        serde_json::from_str(&content).map_err(|e| ApplicationError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Bind a document to a fresh listing form.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Form> {
        let value = self.read(path)?;
        let form = Form::create(listing_shape(), &value)?;
        debug!(nodes = form.arena().len(), "listing loaded");
        Ok(form)
    }

    pub fn check(&self, path: &Path) -> ApplicationResult<ListingReport> {
        let form = self.load(path)?;
        let report = ListingReport::from_snapshot(form.snapshot(), 0);
        info!(path = %path.display(), valid = report.valid, "checked listing");
        Ok(report)
    }

    /// Apply `edits` in order. The first failing edit aborts; the document
    /// on disk is only rewritten when `write_back` is set.
    #[instrument(level = "debug", skip(self, edits))]
    pub fn edit(
        &self,
        path: &Path,
        edits: &[Edit],
        write_back: bool,
    ) -> ApplicationResult<ListingReport> {
        let mut form = self.load(path)?;
        for edit in edits {
            edit.apply(&mut form)?;
        }
        if write_back {
            self.save(path, &form)?;
        }
        Ok(ListingReport::from_snapshot(form.snapshot(), edits.len()))
    }

    pub fn save(&self, path: &Path, form: &Form) -> ApplicationResult<()> {
        let content =
            serde_json::to_string_pretty(form.value()).map_err(|e| ApplicationError::OperationFailed {
                context: format!("serialize listing: {}", path.display()),
                source: Box::new(e),
            })?;
        self.fs
            .write(path, &content)
            .with_path_context("write listing", path)?;
        info!(path = %path.display(), "listing written");
        Ok(())
    }

    /// A blank listing with a fresh id.
    pub fn draft(&self) -> ApplicationResult<Form> {
        let id = uuid::Uuid::new_v4().to_string();
        Ok(Form::create(listing_shape(), &json!({ "id": id }))?)
    }

    /// Typed view of a valid form.
    pub fn typed(&self, form: &Form) -> ApplicationResult<Listing> {
        Ok(form.value_as::<Listing>()?)
    }
}
