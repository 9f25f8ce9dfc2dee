//! Diff engine
//!
//! Classifies every filename in local ∪ remote into exactly one of
//! create / update / delete / skip. Pure and deterministic.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use kb_fs::LocalDocument;
use kb_remote::RemoteDocument;
use serde::Serialize;

/// Planned reconciliation action for one filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Create,
    Update,
    Delete,
    Skip,
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffAction::Create => write!(f, "create"),
            DiffAction::Update => write!(f, "update"),
            DiffAction::Delete => write!(f, "delete"),
            DiffAction::Skip => write!(f, "skip"),
        }
    }
}

/// Why an existing remote document needs an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    /// The remote stored a fingerprint and it differs from the local one.
    FingerprintChanged,
    /// The remote has no stored fingerprint.
    FingerprintNotSet,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateReason::FingerprintChanged => write!(f, "fingerprint changed"),
            UpdateReason::FingerprintNotSet => write!(f, "fingerprint not set"),
        }
    }
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub action: DiffAction,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UpdateReason>,
}

/// Compare local documents against remote documents by name and fingerprint.
///
/// When the remote holds several documents with the same name, the last one
/// listed is matched and the other copies are left alone. A name with no
/// local file gets one delete per remote copy.
pub fn calculate_diff(local: &[LocalDocument], remote: &[RemoteDocument]) -> Vec<DiffEntry> {
    let mut by_name: HashMap<&str, &RemoteDocument> = HashMap::new();
    for doc in remote {
        by_name.insert(doc.name.as_str(), doc);
    }

    let local_names: HashSet<&str> = local.iter().map(|d| d.filename()).collect();
    let mut entries = Vec::with_capacity(local.len() + remote.len());

    for doc in local {
        let entry = match by_name.get(doc.filename()) {
            None => DiffEntry {
                action: DiffAction::Create,
                filename: doc.filename().to_string(),
                local_path: Some(doc.path().to_path_buf()),
                remote_id: None,
                reason: None,
            },
            Some(existing) if doc.fingerprint_matches(existing.stored_fingerprint.as_deref()) => {
                DiffEntry {
                    action: DiffAction::Skip,
                    filename: doc.filename().to_string(),
                    local_path: Some(doc.path().to_path_buf()),
                    remote_id: Some(existing.id.clone()),
                    reason: None,
                }
            }
            Some(existing) => DiffEntry {
                action: DiffAction::Update,
                filename: doc.filename().to_string(),
                local_path: Some(doc.path().to_path_buf()),
                remote_id: Some(existing.id.clone()),
                reason: Some(if existing.stored_fingerprint.is_some() {
                    UpdateReason::FingerprintChanged
                } else {
                    UpdateReason::FingerprintNotSet
                }),
            },
        };
        entries.push(entry);
    }

    for doc in remote {
        if !local_names.contains(doc.name.as_str()) {
            entries.push(DiffEntry {
                action: DiffAction::Delete,
                filename: doc.name.clone(),
                local_path: None,
                remote_id: Some(doc.id.clone()),
                reason: None,
            });
        }
    }

    entries
}

/// Diff entries grouped by action, preserving order within each group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffPlan {
    pub creates: Vec<DiffEntry>,
    pub updates: Vec<DiffEntry>,
    pub deletes: Vec<DiffEntry>,
    pub skips: Vec<DiffEntry>,
}

impl DiffPlan {
    pub fn partition(entries: Vec<DiffEntry>) -> Self {
        let mut plan = Self::default();
        for entry in entries {
            match entry.action {
                DiffAction::Create => plan.creates.push(entry),
                DiffAction::Update => plan.updates.push(entry),
                DiffAction::Delete => plan.deletes.push(entry),
                DiffAction::Skip => plan.skips.push(entry),
            }
        }
        plan
    }

    /// Whether applying the plan would change anything remotely.
    pub fn has_changes(&self) -> bool {
        !(self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty())
    }

    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len() + self.skips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
