//! # Document Registry
//!
//! Holds the current version of every issued document, keyed by `id`.
//! Superseded versions are not kept; the ledger is the only history.
//!
//! The registry does not enforce number uniqueness itself. The engine asks
//! [`DocumentRegistry::find_conflicting`] before committing.

use crate::document::{Document, DocumentType};
use crate::validation::normalize_document_number;

#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    /// Newest first. Edits keep their position.
    documents: Vec<Document>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        DocumentRegistry::default()
    }

    pub(crate) fn from_documents(documents: Vec<Document>) -> Self {
        DocumentRegistry { documents }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Trimmed, case-insensitive lookup.
    pub fn find_by_number(&self, number: &str) -> Option<&Document> {
        let wanted = normalize_document_number(number);
        self.documents
            .iter()
            .find(|d| d.normalized_number() == wanted)
    }

    /// A document with the same normalized number but a different id.
    ///
    /// Cancelled documents still reserve their number.
    pub fn find_conflicting(&self, number: &str, id: &str) -> Option<&Document> {
        let wanted = normalize_document_number(number);
        self.documents
            .iter()
            .find(|d| d.id != id && d.normalized_number() == wanted)
    }

    /// Inserts a new document at the head, or replaces the one with the
    /// same id in place. Returns the replaced version.
    pub(crate) fn upsert(&mut self, document: Document) -> Option<Document> {
        match self.documents.iter().position(|d| d.id == document.id) {
            Some(index) => Some(std::mem::replace(&mut self.documents[index], document)),
            None => {
                self.documents.insert(0, document);
                None
            }
        }
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub(crate) fn clear(&mut self) {
        self.documents.clear();
    }

    /// Newest first.
    pub fn list(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn list_by_type(&self, doc_type: DocumentType) -> impl Iterator<Item = &Document> {
        self.documents
            .iter()
            .filter(move |d| d.document_type() == doc_type)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
